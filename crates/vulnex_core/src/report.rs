use crate::Finding;

/// Live output line for a finding, or `None` when the body was empty.
pub fn progress_line(finding: &Finding) -> Option<String> {
    if finding.content_length == 0 {
        return None;
    }

    let line = match finding.status_code {
        200 => format!("[+] Found: {} [{} bytes]", finding.path, finding.content_length),
        301 | 302 | 307 => format!(
            "[{}] {} -> {}",
            finding.status_code,
            finding.target(),
            finding.location.as_deref().unwrap_or("?")
        ),
        status => format!(
            "[{}] {} ({})",
            status,
            finding.path,
            finding.content_type.as_deref().unwrap_or("unknown")
        ),
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::progress_line;
    use crate::{ContentHash, Finding};
    use chrono::{TimeZone, Utc};

    fn finding(status: u16, len: u64) -> Finding {
        Finding {
            url: "https://a.example.com".to_string(),
            path: "admin.php".to_string(),
            status_code: status,
            content_type: Some("text/html; charset=utf-8".to_string()),
            content_length: len,
            body_hash: ContentHash::digest(b"x"),
            location: Some("/admin/login".to_string()),
            discovered_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn formats_each_status_family() {
        assert_eq!(
            progress_line(&finding(200, 512)).unwrap(),
            "[+] Found: admin.php [512 bytes]"
        );
        assert_eq!(
            progress_line(&finding(302, 10)).unwrap(),
            "[302] https://a.example.com/admin.php -> /admin/login"
        );
        assert_eq!(
            progress_line(&finding(403, 10)).unwrap(),
            "[403] admin.php (text/html; charset=utf-8)"
        );
    }

    #[test]
    fn empty_body_has_no_line() {
        assert_eq!(progress_line(&finding(200, 0)), None);
        assert_eq!(progress_line(&finding(401, 0)), None);
    }
}
