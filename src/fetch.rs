//! Idempotent archive fetching.
//!
//! Downloads a remote resource to a local cache path. A file already present
//! at the destination is proof of a prior successful fetch, so the call
//! becomes a no-op. Downloads stream into a scratch directory next to the
//! destination and are renamed into place, so an interrupted download never
//! leaves a partial file where the staleness check would find it.

use crate::error::{Error, Result};
use crate::{fs_utils, output};
use filetime::FileTime;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Fetch `url` to `dest`.
///
/// No-op if `dest` already exists. The local file's modification time is set
/// from the response `Last-Modified` header when present, falling back to
/// the current time, so downstream timestamp comparisons see the remote
/// resource's age rather than the download time.
pub fn fetch(url: &str, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Ok(());
    }

    fs_utils::ensure_parent_dir(dest)?;

    let filename = dest
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());

    // Scratch directory in the destination's parent so the final rename
    // stays on one filesystem.
    let parent = dest.parent().unwrap_or(Path::new("."));
    let scratch = tempfile::tempdir_in(parent)?;
    let tmp = scratch.path().join(&filename);

    let mtime = download_to(url, &tmp, &filename)?;
    filetime::set_file_mtime(&tmp, FileTime::from_system_time(mtime))?;
    std::fs::rename(&tmp, dest)?;

    Ok(())
}

/// Stream the response body to `tmp`, returning the mtime to stamp on it.
fn download_to(url: &str, tmp: &Path, filename: &str) -> Result<SystemTime> {
    let pb = output::spinner(&format!("downloading {}", filename));

    let response = ureq::get(url).call().map_err(|e| {
        pb.finish_and_clear();
        Error::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })?;

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        output::upgrade_to_bytes(&pb, len);
    }

    let last_modified = response
        .header("last-modified")
        .and_then(parse_http_date)
        .unwrap_or_else(SystemTime::now);

    let mut file = std::fs::File::create(tmp)?;
    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| {
            pb.finish_and_clear();
            Error::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])?;
        total_bytes += bytes_read as u64;
        pb.set_position(total_bytes);
    }

    pb.finish_and_clear();
    output::detail(&format!("downloaded {} ({} bytes)", filename, total_bytes));
    Ok(last_modified)
}

/// Parse an RFC 1123 date ("Sun, 06 Nov 1994 08:49:37 GMT") without pulling
/// in a date crate.
fn parse_http_date(s: &str) -> Option<SystemTime> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 6 || !parts[0].ends_with(',') {
        return None;
    }

    let day: u64 = parts[1].parse().ok()?;
    let month = match parts[2] {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    let year: u64 = parts[3].parse().ok()?;
    if year < 1970 || day == 0 || day > 31 {
        return None;
    }

    let hms: Vec<&str> = parts[4].split(':').collect();
    if hms.len() != 3 {
        return None;
    }
    let hours: u64 = hms[0].parse().ok()?;
    let minutes: u64 = hms[1].parse().ok()?;
    let seconds: u64 = hms[2].parse().ok()?;
    if hours > 23 || minutes > 59 || seconds > 60 {
        return None;
    }

    let mut days = 0u64;
    for y in 1970..year {
        days += if is_leap_year(y) { 366 } else { 365 };
    }

    let is_leap = is_leap_year(year);
    let days_in_months: [u64; 12] = [
        31,
        if is_leap { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    for &m in &days_in_months[..(month - 1)] {
        days += m;
    }
    days += day - 1;

    let secs = days * 86400 + hours * 3600 + minutes * 60 + seconds;
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
}

fn is_leap_year(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch_secs(t: SystemTime) -> u64 {
        t.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs()
    }

    #[test]
    fn test_parse_http_date() {
        let t = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(epoch_secs(t), 784111777);
    }

    #[test]
    fn test_parse_http_date_leap_year() {
        // 2024-02-29 is only reachable if leap days are counted
        let t = parse_http_date("Thu, 29 Feb 2024 00:00:00 GMT").unwrap();
        assert_eq!(epoch_secs(t), 1709164800);
    }

    #[test]
    fn test_parse_http_date_rejects_garbage() {
        assert!(parse_http_date("").is_none());
        assert!(parse_http_date("not a date at all").is_none());
        assert!(parse_http_date("Sun, 06 Nov 1969 08:49:37 GMT").is_none());
        assert!(parse_http_date("Sun, 06 Zzz 1994 08:49:37 GMT").is_none());
    }

    #[test]
    fn test_fetch_skips_existing_destination() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("cached.tar.gz");
        std::fs::write(&dest, b"already here").unwrap();

        // The URL is unreachable; an existing destination must short-circuit
        // before any network activity.
        fetch("http://0.0.0.0:1/nothing.tar.gz", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
    }

    #[test]
    fn test_fetch_failure_leaves_no_partial_file() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("missing/archive.tar.gz");

        let err = fetch("http://0.0.0.0:1/archive.tar.gz", &dest).unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert!(!dest.exists());
        // scratch dirs are cleaned up with their tempdir
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }
}
