//! # UFT (UDP File Transfer)
//!
//! UDP 기반 풀(pull) 방식 단일 파일 전송 프로토콜
//!
//! ## 핵심 특징
//! - **수신자 주도**: 수신자가 블록을 하나씩 요청, 송신자는 요청에만 응답
//! - **블록 분할**: 압축된 파일을 번호 붙은 블록으로 나누어 전송
//! - **재요청**: 요청 큐가 비면 아직 받지 못한 블록을 다시 요청
//! - **무결성 검증**: 압축 해제 후 다이제스트 비교, 불일치 시 기록하지 않음
//! - **손실 시뮬레이터**: 테스트용 데이터 단계 패킷 손실 주입
//!
//! ## 패킷
//! 4바이트 ASCII 태그 + 페이로드 (`ACK `, `BYE `, `REQF`, `REQB`, `INFO`, `SEND`)

pub mod block;
pub mod compress;
pub mod config;
pub mod digest;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod reliability;
pub mod sender;
pub mod shutdown;
pub mod simulator;
pub mod stats;
pub mod store;
pub mod transport;

pub use block::{Block, BlockBuilder, BlockNumber};
pub use compress::{Compressor, DeflateCompressor};
pub use config::Config;
pub use digest::{Blake3Digester, Digest, Digester, Md5Digester};
pub use error::{Error, Result};
pub use packet::{InfoPacket, Packet, PacketKind, RawPacket};
pub use receiver::{Receiver, ReceiverState, TransferOutcome, TransferReport};
pub use reliability::{Insertion, RequestTracker};
pub use sender::{Sender, SenderState};
pub use shutdown::Shutdown;
pub use simulator::LossyTransport;
pub use stats::TransferStats;
pub use store::{DirStore, FileStore, MemoryStore};
pub use transport::{MemoryNetwork, MemoryTransport, Transport, UdpTransport};

/// 기본 최대 블록 크기 (바이트)
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 8 * 1024;

/// 송신자 기본 포트
pub const DEFAULT_PORT: u16 = 6000;

/// INFO 수신 확인 ACK 메시지
pub const INFO_ACK_MESSAGE: &str = "INFO";
