use crate::error::{AppError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// A persisted value with an explicit load/save contract
pub trait Store<T> {
    /// Returns `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<T>>;

    /// Overwrites any previously saved value
    fn save(&self, value: &T) -> Result<()>;
}

/// JSON document readable only by the owner, used for secrets
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file if it exists
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }
}

impl<T: Serialize + DeserializeOwned> Store<T> for JsonFile<T> {
    fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let value = serde_json::from_str(&contents)?;

        Ok(Some(value))
    }

    fn save(&self, value: &T) -> Result<()> {
        create_parent_dir(&self.path)?;

        let contents = serde_json::to_string_pretty(value)?;

        // Create file with owner-only permissions from the start to avoid race condition
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)?;
        file.write_all(contents.as_bytes())?;

        Ok(())
    }
}

/// Plain text file holding one line
pub struct TextFile {
    path: PathBuf,
}

impl TextFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Store<String> for TextFile {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let value = contents.trim();

        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn save(&self, value: &String) -> Result<()> {
        create_parent_dir(&self.path)?;
        fs::write(&self.path, value)?;
        Ok(())
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create directory {:?}: {}", parent, e))
        })?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::test_helpers::mock_credential;
    use crate::models::Credential;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn test_json_file_roundtrip_and_permissions() {
        let dir = tempdir().unwrap();
        let store: JsonFile<Credential> = JsonFile::new(dir.path().join("nested/token.json"));
        assert_eq!(store.load().unwrap(), None);

        let credential = mock_credential(3600, &["scope"]);
        store.save(&credential).unwrap();

        assert_eq!(store.load().unwrap(), Some(credential));
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_json_file_clear() {
        let dir = tempdir().unwrap();
        let store: JsonFile<Credential> = JsonFile::new(dir.path().join("token.json"));

        assert!(!store.clear().unwrap());
        store.save(&mock_credential(3600, &[])).unwrap();
        assert!(store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_json_file_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not json").unwrap();

        let store: JsonFile<Credential> = JsonFile::new(path);
        assert!(matches!(store.load(), Err(AppError::Serialization(_))));
    }

    #[test]
    fn test_text_file_trims_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spreadsheet_id.txt");
        let store = TextFile::new(&path);
        assert_eq!(store.load().unwrap(), None);

        fs::write(&path, "  first_id\n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("first_id"));

        store.save(&"second_id".to_string()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second_id");
    }

    #[test]
    fn test_text_file_blank_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spreadsheet_id.txt");
        fs::write(&path, "\n").unwrap();

        assert_eq!(TextFile::new(path).load().unwrap(), None);
    }
}
