pub fn to_ssh(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    let Some(rest) = rest else {
        return url.to_string();
    };
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    match rest.split_once('/') {
        Some((host, path)) => {
            if path.ends_with(".git") {
                format!("git@{host}:{path}")
            } else {
                format!("git@{host}:{path}.git")
            }
        }
        None => url.to_string(),
    }
}

pub fn to_http(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("git@") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        return match rest.split_once(':') {
            Some((host, path)) => format!("https://{host}/{path}"),
            None => url.to_string(),
        };
    }
    if let Some(rest) = url.strip_prefix("ssh://git@") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        return format!("https://{rest}");
    }
    url.to_string()
}

/// Short repository name from any supported remote form, e.g. `repo` from
/// `git@host:user/repo.git`.
pub fn extract_name(url: &str) -> String {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let last = trimmed.rsplit('/').next().unwrap_or_default();
    // scp-style `host:repo` has no slash before the name
    last.rsplit(':').next().unwrap_or_default().to_string()
}

/// Rejects URLs that git could read as an option or that would split into
/// several arguments.
pub fn validate_url(url: &str) -> Result<(), String> {
    if url.is_empty() || url.chars().any(char::is_whitespace) || url.starts_with('-') {
        return Err(format!("invalid git URL: {url}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_transports() {
        let cases = [
            (
                "https://github.com/user/repo",
                "git@github.com:user/repo.git",
                "https://github.com/user/repo",
            ),
            (
                "https://github.com/user/repo.git",
                "git@github.com:user/repo.git",
                "https://github.com/user/repo.git",
            ),
            (
                "git@github.com:user/repo.git",
                "git@github.com:user/repo.git",
                "https://github.com/user/repo",
            ),
            (
                "ssh://git@github.com/user/repo.git",
                "ssh://git@github.com/user/repo.git",
                "https://github.com/user/repo",
            ),
            (
                "http://gitlab.example.org/group/sub/repo/",
                "git@gitlab.example.org:group/sub/repo.git",
                "http://gitlab.example.org/group/sub/repo/",
            ),
        ];
        for (url, want_ssh, want_http) in cases {
            assert_eq!(to_ssh(url), want_ssh, "to_ssh({url})");
            assert_eq!(to_http(url), want_http, "to_http({url})");
        }
    }

    #[test]
    fn leaves_unrecognized_urls_alone() {
        assert_eq!(to_ssh("/srv/git/repo"), "/srv/git/repo");
        assert_eq!(to_http("/srv/git/repo"), "/srv/git/repo");
        assert_eq!(to_ssh("https://hostonly"), "https://hostonly");
        assert_eq!(to_http("git@hostonly"), "git@hostonly");
        assert_eq!(to_ssh(""), "");
    }

    #[test]
    fn conversions_are_near_inverses() {
        let https = "https://github.com/user/repo";
        let ssh = "git@github.com:user/repo.git";
        assert_eq!(to_http(&to_ssh(https)), to_http(https));
        assert_eq!(to_ssh(&to_http(ssh)), to_ssh(ssh));
        assert_eq!(to_ssh(&to_http(&to_ssh(https))), to_ssh(https));
    }

    #[test]
    fn extracts_repo_names() {
        let cases = [
            ("https://github.com/user/repo", "repo"),
            ("https://github.com/user/repo.git", "repo"),
            ("git@github.com:user/repo.git", "repo"),
            ("git@github.com:repo.git", "repo"),
            ("ssh://git@github.com/user/repo.git", "repo"),
            ("https://github.com/user/repo/", "repo"),
            ("", ""),
        ];
        for (url, want) in cases {
            assert_eq!(extract_name(url), want, "extract_name({url})");
        }
    }

    #[test]
    fn rejects_injection_hazards() {
        assert!(validate_url("https://github.com/user/repo").is_ok());
        assert!(validate_url("git@github.com:user/repo.git").is_ok());
        assert!(validate_url("ssh://git@github.com/user/repo").is_ok());
        assert!(validate_url("https://github.com/user/repo --option").is_err());
        assert!(validate_url("-o github.com/user/repo").is_err());
        assert!(validate_url("https://host/a\tb").is_err());
    }
}
