//! 에러 타입 정의

use thiserror::Error;

/// UFT 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    /// 필수 필드를 담기에 프레임이 너무 짧음
    #[error("잘못된 프레임 ({what}): 최소 {needed} bytes 필요, {got} bytes 수신")]
    MalformedFrame {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("UTF-8 디코딩 실패: {what}")]
    InvalidUtf8 { what: &'static str },

    /// 정의되지 않은 태그
    #[error("알 수 없는 패킷 태그: {tag:?}")]
    UnknownTag { tag: String },

    #[error("프로토콜 불일치: expected {expected:?}, got {got:?}")]
    ProtocolMismatch { expected: String, got: String },

    #[error("체크섬 불일치: expected {expected}, got {got}")]
    ChecksumMismatch { expected: String, got: String },

    #[error("압축 에러: {0}")]
    Compression(String),

    #[error("알 수 없는 파일: {0}")]
    UnknownFile(String),

    #[error("파일 요청 거부됨: {filename} ({attempts}회 시도)")]
    FileRejected { filename: String, attempts: u32 },

    #[error("파일이 너무 큼: {size} bytes (최대 {} bytes)", u32::MAX)]
    FileTooLarge { size: u64 },

    #[error("수신 대기 타임아웃: {idle_ms}ms 동안 패킷 없음")]
    IdleTimeout { idle_ms: u64 },

    #[error("설정 오류: {0}")]
    InvalidConfig(String),

    #[error("연결 종료")]
    ConnectionClosed,
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
