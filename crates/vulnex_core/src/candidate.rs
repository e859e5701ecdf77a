use std::sync::Arc;

use thiserror::Error;

/// Built-in path segments used when no wordlist is supplied.
pub const DEFAULT_PATHS: &[&str] = &[
    "admin",
    "login",
    "wp-admin",
    "wp-login.php",
    "api",
    "api/v1",
    "backup",
    "backups",
    "config",
    "dashboard",
    "debug",
    "dev",
    "old",
    "test",
    "tmp",
    "uploads",
    "server-status",
    ".git/HEAD",
    ".env",
    "phpinfo",
    "console",
    "graphql",
    "swagger",
    "actuator",
];

/// Built-in extensions used when no extension list is supplied.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".html", ".php", ".json", ".bak", ".env", ".old", ".txt", ".zip", ".sql", ".xml",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    #[error("no base URLs supplied")]
    NoBaseUrls,
    #[error("path wordlist is empty")]
    NoPaths,
}

/// One probe target: a base URL, a path segment and an optional extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    base: Arc<str>,
    segment: Arc<str>,
    extension: Option<Arc<str>>,
}

impl Candidate {
    /// Base URL with trailing slashes stripped.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// The requested path relative to the base, e.g. `admin.php`.
    pub fn path(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}{}", self.segment, ext),
            None => self.segment.to_string(),
        }
    }

    /// `base` + `/` + segment [+ extension].
    pub fn url(&self) -> String {
        format!("{}/{}", self.base, self.path())
    }
}

#[derive(Debug)]
struct Inputs {
    bases: Vec<Arc<str>>,
    segments: Vec<Arc<str>>,
    extensions: Vec<Arc<str>>,
}

/// The full candidate space. Cheap to clone; iteration is lazy and can be restarted.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    inputs: Arc<Inputs>,
}

impl CandidateSet {
    pub fn new<B, P, E>(
        base_urls: B,
        paths: P,
        extensions: E,
    ) -> Result<Self, CandidateError>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let bases: Vec<Arc<str>> = base_urls
            .into_iter()
            .map(|base| Arc::from(base.as_ref().trim_end_matches('/')))
            .collect();
        if bases.is_empty() {
            return Err(CandidateError::NoBaseUrls);
        }
        let segments: Vec<Arc<str>> = paths.into_iter().map(|p| Arc::from(p.as_ref())).collect();
        if segments.is_empty() {
            return Err(CandidateError::NoPaths);
        }
        let extensions = extensions
            .into_iter()
            .map(|e| Arc::from(e.as_ref()))
            .collect();

        Ok(Self {
            inputs: Arc::new(Inputs {
                bases,
                segments,
                extensions,
            }),
        })
    }

    /// Built-in wordlists applied to the given base URLs.
    pub fn with_defaults<B>(base_urls: B) -> Result<Self, CandidateError>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self::new(base_urls, DEFAULT_PATHS, DEFAULT_EXTENSIONS)
    }

    pub fn len(&self) -> usize {
        let inputs = &self.inputs;
        inputs.bases.len() * inputs.segments.len() * (inputs.extensions.len() + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> CandidateIter {
        CandidateIter {
            inputs: Arc::clone(&self.inputs),
            base: 0,
            segment: 0,
            variant: 0,
        }
    }
}

impl IntoIterator for &CandidateSet {
    type Item = Candidate;
    type IntoIter = CandidateIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walks bases, then segments, then variants (bare first, then each extension).
#[derive(Debug, Clone)]
pub struct CandidateIter {
    inputs: Arc<Inputs>,
    base: usize,
    segment: usize,
    variant: usize,
}

impl Iterator for CandidateIter {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let inputs = &self.inputs;
        if self.base >= inputs.bases.len() {
            return None;
        }

        let extension = match self.variant {
            0 => None,
            n => Some(Arc::clone(&inputs.extensions[n - 1])),
        };
        let candidate = Candidate {
            base: Arc::clone(&inputs.bases[self.base]),
            segment: Arc::clone(&inputs.segments[self.segment]),
            extension,
        };

        self.variant += 1;
        if self.variant > inputs.extensions.len() {
            self.variant = 0;
            self.segment += 1;
            if self.segment >= inputs.segments.len() {
                self.segment = 0;
                self.base += 1;
            }
        }

        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let inputs = &self.inputs;
        let per_segment = inputs.extensions.len() + 1;
        let per_base = inputs.segments.len() * per_segment;
        let consumed = self.base * per_base + self.segment * per_segment + self.variant;
        let remaining = (inputs.bases.len() * per_base).saturating_sub(consumed);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CandidateIter {}
