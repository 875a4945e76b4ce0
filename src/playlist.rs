use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Renders a merge list as a concat list, one `file '...'` entry per clip in
/// merge order. Single quotes inside a reference are escaped the way the
/// concat demuxer expects.
pub fn render_concat_list(merge_list: &[String]) -> String {
    let mut out = String::from("ffconcat version 1.0\n");
    for item in merge_list {
        let escaped = item.replace('\'', r"'\''");
        out.push_str(&format!("file '{}'\n", escaped));
    }
    out
}

pub async fn write_concat_list(merge_list: &[String], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    let mut listf = fs::File::create(path)
        .await
        .with_context(|| format!("create playlist: {}", path.display()))?;
    listf
        .write_all(render_concat_list(merge_list).as_bytes())
        .await?;
    listf.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_follow_merge_order() {
        let list = vec![
            "https://v/b.mp4".to_string(),
            "file:///tmp/it's mine.mp4".to_string(),
        ];
        assert_eq!(
            render_concat_list(&list),
            "ffconcat version 1.0\nfile 'https://v/b.mp4'\nfile 'file:///tmp/it'\\''s mine.mp4'\n"
        );
    }

    #[tokio::test]
    async fn writes_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists").join("merge.ffconcat");
        write_concat_list(&["https://v/a.mp4".to_string()], &path)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("file 'https://v/a.mp4'\n"));
    }
}
