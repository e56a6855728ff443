use crate::store::FileStore;

/// Substrings the boot check flags.
pub const SIGNATURES: &[&str] = &["atob(", "document", "XMLHttpRequest"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Threat(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub name: String,
    pub verdict: Verdict,
}

impl ScanReport {
    pub fn line(&self) -> String {
        match self.verdict {
            Verdict::Clean => format!("[ {} ] - Clean ✔", self.name),
            Verdict::Threat(sig) => format!("[ Threat in {} ] ➤ Pattern: \"{}\"", self.name, sig),
        }
    }

    pub fn color(&self) -> &'static str {
        match self.verdict {
            Verdict::Clean => "lime",
            Verdict::Threat(_) => "red",
        }
    }
}

/// Advisory only: reports the first matching signature per file and never
/// touches content.
pub fn scan_files(store: &FileStore) -> Vec<ScanReport> {
    store
        .iter()
        .map(|(name, content)| ScanReport {
            name: name.to_string(),
            verdict: SIGNATURES
                .iter()
                .find(|sig| content.contains(**sig))
                .map_or(Verdict::Clean, |sig| Verdict::Threat(*sig)),
        })
        .collect()
}
