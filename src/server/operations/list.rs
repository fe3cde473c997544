//! `LIST [user]` (§4.12).

use std::path::Path;

use super::OperationContext;

/// Enumerates `storage_root` (or its `user` subdirectory), one regular file
/// per line, skipping dotfiles, symlinks, and nested directories.
///
/// Returns the full multi-line reply body (including the leading
/// `SUCCESS\n`) to write verbatim to the socket.
pub async fn handle(ctx: &OperationContext, user: Option<String>) -> String {
    let root = match &user {
        Some(u) => ctx.state.config.storage_root.join(u),
        None => ctx.state.config.storage_root.clone(),
    };
    let scope = user.as_deref().unwrap_or("all");

    let entries = match list_regular_files(&root).await {
        Ok(entries) => entries,
        Err(_) => {
            ctx.state
                .audit
                .record_operation("LIST", scope, true, "0 files (directory missing)")
                .await;
            return "SUCCESS\nNo files found\n".to_string();
        }
    };

    ctx.state
        .audit
        .record_operation("LIST", scope, true, &format!("{} files", entries.len()))
        .await;

    if entries.is_empty() {
        return "SUCCESS\nNo files found\n".to_string();
    }

    let mut body = String::from("SUCCESS\n");
    for (name, size) in entries {
        match &user {
            Some(u) => body.push_str(&format!("{u}/{name} ({size} bytes)\n")),
            None => body.push_str(&format!("{name} ({size} bytes)\n")),
        }
    }
    body
}

async fn list_regular_files(root: &Path) -> std::io::Result<Vec<(String, u64)>> {
    let mut read_dir = tokio::fs::read_dir(root).await?;
    let mut out = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().await?;
        if !file_type.is_file() {
            continue;
        }
        let size = entry.metadata().await?.len();
        out.push((name.into_owned(), size));
    }

    out.sort();
    Ok(out)
}
