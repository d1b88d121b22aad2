use crate::error::{Result, ScanError};
use url::Url;

/// An absolute URL together with its components as they were written.
///
/// `Url` validates the reference and acts as the base for later joins, but
/// it normalizes what it stores: paths and queries are percent-encoded,
/// IDN hosts become punycode and a default port is forgotten. The written
/// host, port, path and query are therefore kept next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    url: Url,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl ResolvedUrl {
    /// Parses an absolute URL. A reference without a scheme is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|e| invalid(raw, e))?;
        Ok(Self::from_reference(url, Reference::split(raw)))
    }

    /// Like [`ResolvedUrl::parse`], but also reads a scheme-less
    /// `host[:port]/path` string, which is what [`canonicalize`] produces,
    /// as an `http` URL.
    pub fn parse_lenient(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if is_schemeless_authority(raw) {
            Self::parse(&format!("http://{}", raw))
        } else {
            Self::parse(raw)
        }
    }

    /// Resolves `raw` relative to this URL (RFC 3986 section 5.2 on the
    /// written text).
    pub fn join(&self, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = self.url.join(raw).map_err(|e| invalid(raw, e))?;
        let mut reference = Reference::split(raw);

        if let Some(scheme) = reference.scheme {
            // `http:page` under an http base is read as a relative path
            if reference.authority.is_some() || !scheme.eq_ignore_ascii_case(self.url.scheme()) {
                return Ok(Self::from_reference(url, reference));
            }
            reference.scheme = None;
        }

        if reference.authority.is_some() {
            return Ok(Self::from_reference(url, reference));
        }

        let (path, query) = if reference.path.is_empty() {
            (self.path.clone(), reference.query.or(self.query.as_deref()))
        } else if reference.path.starts_with('/') {
            (reference.path.to_string(), reference.query)
        } else {
            (remove_dot_segments(&self.merge(reference.path)), reference.query)
        };

        Ok(Self {
            url,
            host: self.host.clone(),
            port: self.port,
            path,
            query: query.map(str::to_string),
        })
    }

    /// Host, optional port, path and query. Scheme, userinfo and fragment
    /// are dropped.
    pub fn canonical(&self) -> Result<String> {
        let host = self
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ScanError::InvalidUrl(format!("no host in '{}'", self.url)))?;

        let mut canonical = host.to_lowercase();
        if let Some(port) = self.port {
            canonical.push(':');
            canonical.push_str(&port.to_string());
        }
        canonical.push_str(&self.path);
        if let Some(query) = &self.query {
            canonical.push('?');
            canonical.push_str(query);
        }

        Ok(canonical)
    }

    fn from_reference(url: Url, reference: Reference<'_>) -> Self {
        let (host, port) = match reference.authority {
            Some(authority) => {
                let (host, port) = split_authority(authority);
                (Some(host.to_string()), port)
            }
            None => (None, None),
        };

        Self {
            url,
            host,
            port,
            path: reference.path.to_string(),
            query: reference.query.map(str::to_string),
        }
    }

    fn merge(&self, path: &str) -> String {
        if self.host.is_some() && self.path.is_empty() {
            return format!("/{}", path);
        }
        match self.path.rfind('/') {
            Some(slash) => format!("{}{}", &self.path[..=slash], path),
            None => path.to_string(),
        }
    }
}

/// Canonicalizes `raw`, resolving it against `base` when one is given.
///
/// ```
/// use warcgraph_scanner::canonicalize;
///
/// let canonical = canonicalize("https://Foo.BAR.com/index.html?blah#sam", None).unwrap();
/// assert_eq!(canonical, "foo.bar.com/index.html?blah");
/// ```
pub fn canonicalize(raw: &str, base: Option<&ResolvedUrl>) -> Result<String> {
    let resolved = match base {
        Some(base) => base.join(raw)?,
        None => ResolvedUrl::parse_lenient(raw)?,
    };
    resolved.canonical()
}

/// The written components of a URI reference, fragment removed.
#[derive(Debug, PartialEq, Eq)]
struct Reference<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
}

impl<'a> Reference<'a> {
    fn split(raw: &'a str) -> Self {
        let raw = raw.split_once('#').map_or(raw, |(before, _)| before);

        let (scheme, rest) = match scheme_len(raw) {
            Some(len) => (Some(&raw[..len - 1]), &raw[len..]),
            None => (None, raw),
        };

        let (authority, rest) = match rest.strip_prefix("//") {
            Some(rest) => {
                let end = rest.find(['/', '?']).unwrap_or(rest.len());
                (Some(&rest[..end]), &rest[end..])
            }
            None => (None, rest),
        };

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        Self {
            scheme,
            authority,
            path,
            query,
        }
    }
}

fn invalid(raw: &str, err: url::ParseError) -> ScanError {
    ScanError::InvalidUrl(format!("'{}': {}", raw, err))
}

/// Length of a leading `scheme:` prefix, if present.
fn scheme_len(s: &str) -> Option<usize> {
    let colon = s.find(':')?;
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(colon + 1)
    } else {
        None
    }
}

/// Written host and port of an authority, userinfo removed.
fn split_authority(authority: &str) -> (&str, Option<u16>) {
    let host_port = authority.rsplit('@').next().unwrap_or(authority);

    let (host, port) = if host_port.starts_with('[') {
        match host_port.find(']') {
            Some(end) => (&host_port[..=end], host_port[end + 1..].strip_prefix(':')),
            None => (host_port, None),
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    let port = port
        .filter(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|port| port.parse().ok());
    (host, port)
}

fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }

    output
}

fn pop_segment(output: &mut String) {
    let cut = output.rfind('/').unwrap_or(0);
    output.truncate(cut);
}

/// Recognizes `host[:port]` followed by an optional path or query, with no
/// scheme in front.
fn is_schemeless_authority(s: &str) -> bool {
    let end = s.find(['/', '?', '#']).unwrap_or(s.len());
    let authority = &s[..end];

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) if !authority.starts_with('[') || host.ends_with(']') => {
            (host, Some(port))
        }
        _ => (authority, None),
    };

    if let Some(port) = port
        && (port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()))
    {
        return false;
    }

    if host.starts_with('[') {
        return host.ends_with(']') && host.len() > 2;
    }

    !host.is_empty()
        && !host.starts_with(['.', '-'])
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_'))
}
