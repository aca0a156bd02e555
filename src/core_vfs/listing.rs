use crate::core_vfs::error::FsError;
use chrono::{DateTime, Duration as ChronoDuration, Local};
use log::warn;
use std::collections::HashMap;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `ls -l` style lines, used by LIST and STAT.
    Long,
    /// Bare file names, used by NLST.
    NamesOnly,
}

/// Reads `dir` and renders one line per entry, sorted by name.
pub async fn list_directory(dir: &Path, format: ListFormat) -> Result<Vec<String>, FsError> {
    let display = dir.display().to_string();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| FsError::from_io(&display, e))?;

    let mut rows: Vec<(String, Option<Metadata>)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FsError::from_io(&display, e))?
    {
        let name = printable_name(&entry.file_name().to_string_lossy());
        let metadata = match format {
            ListFormat::NamesOnly => None,
            ListFormat::Long => match entry.metadata().await {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!("Failed to get metadata for entry: {:?}, error: {:?}", entry.path(), e);
                    continue;
                }
            },
        };
        rows.push((name, metadata));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut owners = OwnerCache::default();
    let now = Local::now();
    Ok(rows
        .into_iter()
        .map(|(name, metadata)| match metadata {
            Some(metadata) => format_long_entry(&name, &metadata, &mut owners, now),
            None => name,
        })
        .collect())
}

/// Listing lines are CRLF-framed, so line breaks in a name are shown as `?`
/// the way `ls -q` does.
fn printable_name(name: &str) -> String {
    name.replace(['\r', '\n'], "?")
}

fn format_long_entry(
    name: &str,
    metadata: &Metadata,
    owners: &mut OwnerCache,
    now: DateTime<Local>,
) -> String {
    let (mode, nlink, uid, gid) = unix_fields(metadata);
    let file_type = if metadata.file_type().is_symlink() {
        'l'
    } else if metadata.is_dir() {
        'd'
    } else {
        '-'
    };
    let mtime = metadata
        .modified()
        .map(|t| format_mtime(t, now))
        .unwrap_or_else(|_| String::from("Jan  1  1970"));

    format!(
        "{}{} {:>3} {:<8} {:<8} {:>10} {} {}",
        file_type,
        format_permissions(mode),
        nlink,
        owners.user(uid),
        owners.group(gid),
        metadata.len(),
        mtime,
        name
    )
}

/// Renders the nine `rwx` permission characters of a unix mode.
pub fn format_permissions(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|(bit, c)| if mode & bit != 0 { *c } else { '-' })
        .collect()
}

/// Entries older than six months show the year instead of the time, like `ls`.
pub fn format_mtime(modified: SystemTime, now: DateTime<Local>) -> String {
    let modified: DateTime<Local> = modified.into();
    let age = now.signed_duration_since(modified);
    if age > ChronoDuration::days(182) || age < ChronoDuration::days(-1) {
        modified.format("%b %e  %Y").to_string()
    } else {
        modified.format("%b %e %H:%M").to_string()
    }
}

#[cfg(unix)]
fn unix_fields(metadata: &Metadata) -> (u32, u64, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (metadata.mode(), metadata.nlink(), metadata.uid(), metadata.gid())
}

#[cfg(not(unix))]
fn unix_fields(metadata: &Metadata) -> (u32, u64, u32, u32) {
    let mode = if metadata.is_dir() { 0o755 } else { 0o644 };
    (mode, 1, 0, 0)
}

/// Memoizes uid/gid → name lookups for the duration of one listing.
#[derive(Default)]
struct OwnerCache {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl OwnerCache {
    fn user(&mut self, uid: u32) -> String {
        self.users.entry(uid).or_insert_with(|| lookup_user(uid)).clone()
    }

    fn group(&mut self, gid: u32) -> String {
        self.groups.entry(gid).or_insert_with(|| lookup_group(gid)).clone()
    }
}

#[cfg(unix)]
fn lookup_user(uid: u32) -> String {
    use nix::unistd::{Uid, User};
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

#[cfg(unix)]
fn lookup_group(gid: u32) -> String {
    use nix::unistd::{Gid, Group};
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}

#[cfg(not(unix))]
fn lookup_user(_uid: u32) -> String {
    String::from("owner")
}

#[cfg(not(unix))]
fn lookup_group(_gid: u32) -> String {
    String::from("group")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    #[test]
    fn test_format_permissions() {
        assert_eq!(format_permissions(0o755), "rwxr-xr-x");
        assert_eq!(format_permissions(0o644), "rw-r--r--");
        assert_eq!(format_permissions(0o040700), "rwx------");
        assert_eq!(format_permissions(0), "---------");
    }

    #[test]
    fn test_format_mtime_recent_and_old() {
        let now = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let recent: SystemTime = Local
            .with_ymd_and_hms(2024, 6, 1, 9, 5, 0)
            .unwrap()
            .into();
        let old: SystemTime = Local
            .with_ymd_and_hms(2022, 3, 7, 9, 5, 0)
            .unwrap()
            .into();
        assert_eq!(format_mtime(recent, now), "Jun  1 09:05");
        assert_eq!(format_mtime(old, now), "Mar  7  2022");
    }

    #[tokio::test]
    async fn test_names_only_listing_is_sorted() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.txt"), b"bb").unwrap();
        fs::write(temp.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(temp.path().join("c")).unwrap();

        let names = list_directory(temp.path(), ListFormat::NamesOnly).await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    }

    #[tokio::test]
    async fn test_long_listing_marks_directories() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("file.txt"), b"hello").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let lines = list_directory(temp.path(), ListFormat::Long).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('-'));
        assert!(lines[0].ends_with(" file.txt"));
        assert!(lines[0].contains(" 5 "));
        assert!(lines[1].starts_with('d'));
        assert!(lines[1].ends_with(" sub"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_line_breaks_in_names_are_masked() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("x\r\n226 done"), b"").unwrap();

        let names = list_directory(temp.path(), ListFormat::NamesOnly).await.unwrap();
        assert_eq!(names, vec!["x??226 done"]);
        let lines = list_directory(temp.path(), ListFormat::Long).await.unwrap();
        assert!(lines[0].ends_with(" x??226 done"), "{:?}", lines);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = list_directory(&temp.path().join("nope"), ListFormat::Long)
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }
}
