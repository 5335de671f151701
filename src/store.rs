//! 파일 저장소
//!
//! 송신측은 시작 시 한 번 목록을 스캔하고, 이후로는 읽기만 함

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// 파일 저장소
pub trait FileStore: Send + Sync {
    /// 전송 가능한 파일 이름 목록 (상대 경로)
    fn list(&self) -> Result<HashSet<String>>;

    /// 파일 읽기
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// 파일 쓰기
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// 디렉토리 이름 하나로만 이루어진 파일명인지 확인
///
/// 경로 구분자나 `..`가 들어간 이름은 전송 대상이 아님
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// 디렉토리 기반 저장소 (최상위 파일만)
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for DirStore {
    fn list(&self) -> Result<HashSet<String>> {
        let mut files = HashSet::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // UTF-8이 아닌 이름은 REQF로 요청할 수 없음
            if let Some(name) = entry.file_name().to_str() {
                files.insert(name.to_string());
            }
        }

        debug!("{:?}에서 파일 {}개 발견", self.root, files.len());
        Ok(files)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        if !is_plain_file_name(name) {
            return Err(Error::UnknownFile(name.to_string()));
        }
        Ok(fs::read(self.root.join(name))?)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        Ok(fs::write(path, data)?)
    }
}

/// 메모리 기반 저장소
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
    written: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 전송 가능한 파일 추가
    pub fn with_file(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.write().insert(name.into(), data.into());
        self
    }

    /// 기록된 파일 내용
    pub fn written(&self, path: &Path) -> Option<Vec<u8>> {
        self.written.read().get(path).cloned()
    }

    pub fn written_count(&self) -> usize {
        self.written.read().len()
    }
}

impl FileStore for MemoryStore {
    fn list(&self) -> Result<HashSet<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownFile(name.to_string()))
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.written.write().insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }
}
