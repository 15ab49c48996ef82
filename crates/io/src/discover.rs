use std::path::{Path, PathBuf};

use contract_audit_recon::{AuditConfig, ReferenceCategory};
use tracing::{debug, info, warn};

use crate::error::IoError;

pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

/// How a file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Excel,
    Csv,
}

impl FileKind {
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            e if SUPPORTED_EXTENSIONS.contains(&e) => Some(Self::Excel),
            _ => None,
        }
    }
}

/// The five input files of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSet {
    pub primary: PathBuf,
    pub references: Vec<(ReferenceCategory, PathBuf)>,
}

impl InputSet {
    pub fn reference(&self, category: ReferenceCategory) -> Option<&Path> {
        self.references
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, p)| p.as_path())
    }
}

/// Locate every input by file-name keyword.
///
/// `paths` may mix files and directories; directories are listed one level
/// deep in name order. Each file serves at most one category.
pub fn discover(paths: &[PathBuf], config: &AuditConfig) -> Result<InputSet, IoError> {
    let candidates = collect_candidates(paths)?;
    let mut claimed = vec![false; candidates.len()];

    let primary = claim(&candidates, &mut claimed, &config.primary.file_keyword).ok_or_else(|| {
        IoError::MissingInput {
            category: "primary".into(),
            keyword: config.primary.file_keyword.clone(),
        }
    })?;
    info!(category = "primary", path = %primary.display(), "input found");

    let mut references = Vec::new();
    for category in ReferenceCategory::ALL {
        let Some(rc) = config.reference(category) else {
            continue;
        };
        let path = claim(&candidates, &mut claimed, &rc.file_keyword)
            .ok_or_else(|| IoError::missing_reference(category, &rc.file_keyword))?;
        info!(category = %category, path = %path.display(), "input found");
        references.push((category, path));
    }

    Ok(InputSet { primary, references })
}

fn claim(candidates: &[PathBuf], claimed: &mut [bool], keyword: &str) -> Option<PathBuf> {
    let idx = candidates.iter().enumerate().position(|(i, p)| {
        !claimed[i] && file_name(p).is_some_and(|name| name.contains(keyword))
    })?;
    claimed[idx] = true;
    Some(candidates[idx].clone())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn collect_candidates(paths: &[PathBuf]) -> Result<Vec<PathBuf>, IoError> {
    let mut out = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path).map_err(|e| IoError::read(path, e))?;
        if meta.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| IoError::read(path, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            out.extend(entries.into_iter().filter(|p| usable(p, false)));
        } else if usable(path, true) {
            out.push(path.clone());
        }
    }
    debug!(count = out.len(), "input candidates");
    Ok(out)
}

fn usable(path: &Path, explicit: bool) -> bool {
    let Some(name) = file_name(path) else {
        return false;
    };
    if name.starts_with("~$") {
        return false;
    }
    if FileKind::of(path).is_none() {
        if explicit {
            warn!(path = %path.display(), "unsupported file type ignored");
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, b"").unwrap();
        p
    }

    fn full_set(dir: &Path) {
        for name in ["人事合同记录表.xlsx", "放款明细.xlsx", "字段表.xlsx", "二次明细.xls", "重卡数据.csv"] {
            touch(dir, name);
        }
    }

    #[test]
    fn finds_all_five_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        full_set(dir.path());
        touch(dir.path(), "~$人事合同记录表.xlsx");
        touch(dir.path(), "readme.txt");

        let set = discover(&[dir.path().to_path_buf()], &AuditConfig::default()).unwrap();
        assert!(set.primary.ends_with("人事合同记录表.xlsx"));
        assert!(set.reference(ReferenceCategory::FieldMaster).unwrap().ends_with("字段表.xlsx"));
        assert!(set.reference(ReferenceCategory::HeavyTruck).unwrap().ends_with("重卡数据.csv"));
        assert_eq!(set.references.len(), 4);
    }

    #[test]
    fn missing_category_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "人事合同记录表.xlsx");
        touch(dir.path(), "放款明细.xlsx");
        let err = discover(&[dir.path().to_path_buf()], &AuditConfig::default()).unwrap_err();
        assert_eq!(
            err,
            IoError::MissingInput { category: "field_master".into(), keyword: "字段".into() }
        );
    }

    #[test]
    fn a_file_is_claimed_once() {
        let dir = tempfile::tempdir().unwrap();
        full_set(dir.path());
        // Matches both 记录表 and 字段, and sorts first
        let both = touch(dir.path(), "0_字段记录表.xlsx");
        let set = discover(&[dir.path().to_path_buf()], &AuditConfig::default()).unwrap();
        assert_eq!(set.primary, both);
        assert!(set.reference(ReferenceCategory::FieldMaster).unwrap().ends_with("字段表.xlsx"));
    }

    #[test]
    fn explicit_files_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        full_set(dir.path());
        let files: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(discover(&files, &AuditConfig::default()).is_ok());

        let err = discover(&[dir.path().join("nope.xlsx")], &AuditConfig::default()).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }

    #[test]
    fn file_kind_by_extension() {
        assert_eq!(FileKind::of(Path::new("a.XLSX")), Some(FileKind::Excel));
        assert_eq!(FileKind::of(Path::new("a.ods")), Some(FileKind::Excel));
        assert_eq!(FileKind::of(Path::new("a.csv")), Some(FileKind::Csv));
        assert_eq!(FileKind::of(Path::new("a.txt")), None);
        assert_eq!(FileKind::of(Path::new("noext")), None);
    }
}
