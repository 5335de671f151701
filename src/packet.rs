//! 패킷 정의
//!
//! 와이어 포맷: tag(4, ASCII, 공백 패딩) || payload(가변)
//! 길이 필드 없이 데이터그램 경계가 곧 패킷 경계

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockNumber};
use crate::digest::Digest;
use crate::{Error, Result};

/// 태그 길이 (바이트)
pub const TAG_LEN: usize = 4;

/// INFO 페이로드 길이: digest(16) + file_size(4) + max_block_size(4) + block_count(4)
pub const INFO_PAYLOAD_LEN: usize = 16 + 4 + 4 + 4;

/// 패킷 종류
///
/// `Unknown`은 저장되지 않고 태그로부터 유도됨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Ack,
    Bye,
    RequestFile,
    RequestBlock,
    Info,
    Send,
    Unknown,
}

impl PacketKind {
    /// 정의된 태그 목록
    pub const KNOWN: [PacketKind; 6] = [
        PacketKind::Ack,
        PacketKind::Bye,
        PacketKind::RequestFile,
        PacketKind::RequestBlock,
        PacketKind::Info,
        PacketKind::Send,
    ];

    /// 와이어 태그
    pub fn tag(&self) -> Option<[u8; TAG_LEN]> {
        match self {
            PacketKind::Ack => Some(*b"ACK "),
            PacketKind::Bye => Some(*b"BYE "),
            PacketKind::RequestFile => Some(*b"REQF"),
            PacketKind::RequestBlock => Some(*b"REQB"),
            PacketKind::Info => Some(*b"INFO"),
            PacketKind::Send => Some(*b"SEND"),
            PacketKind::Unknown => None,
        }
    }

    /// 태그로부터 종류 판별
    pub fn from_tag(tag: &[u8; TAG_LEN]) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.tag().as_ref() == Some(tag))
            .unwrap_or(PacketKind::Unknown)
    }

    /// 데이터 전송 단계 패킷 여부 (REQB/SEND)
    pub fn is_data_plane(&self) -> bool {
        matches!(self, PacketKind::RequestBlock | PacketKind::Send)
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => f.write_str(&String::from_utf8_lossy(&tag)),
            None => f.write_str("UNKNOWN"),
        }
    }
}

/// 태그 + 페이로드로만 이루어진 일반 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub tag: [u8; TAG_LEN],
    pub payload: Bytes,
}

impl RawPacket {
    pub fn new(tag: [u8; TAG_LEN], payload: Bytes) -> Self {
        Self { tag, payload }
    }

    /// 바이트에서 프레임 파싱
    ///
    /// 4바이트 미만이면 `MalformedFrame`, 나머지는 (비어 있어도) 페이로드
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TAG_LEN {
            return Err(Error::MalformedFrame {
                what: "packet tag",
                needed: TAG_LEN,
                got: bytes.len(),
            });
        }

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[..TAG_LEN]);

        Ok(Self {
            tag,
            payload: Bytes::copy_from_slice(&bytes[TAG_LEN..]),
        })
    }

    /// 프레임을 바이트로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TAG_LEN + self.payload.len());
        buf.extend_from_slice(&self.tag);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// 패킷 종류
    pub fn kind(&self) -> PacketKind {
        PacketKind::from_tag(&self.tag)
    }

    pub fn is_unknown(&self) -> bool {
        self.kind() == PacketKind::Unknown
    }

    /// 태그에 맞는 타입으로 해석
    pub fn decode(&self) -> Result<Packet> {
        let payload = &self.payload[..];

        match self.kind() {
            PacketKind::Ack => Ok(Packet::Ack {
                message: utf8(payload, "ack message")?,
            }),
            PacketKind::Bye => Ok(Packet::Bye),
            PacketKind::RequestFile => Ok(Packet::RequestFile {
                filename: utf8(payload, "request filename")?,
            }),
            PacketKind::RequestBlock => {
                if payload.len() < 4 {
                    return Err(Error::MalformedFrame {
                        what: "block request",
                        needed: 4,
                        got: payload.len(),
                    });
                }
                let number = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                Ok(Packet::RequestBlock { number })
            }
            PacketKind::Info => Ok(Packet::Info(InfoPacket::from_bytes(payload)?)),
            PacketKind::Send => Ok(Packet::Send(Block::from_bytes(payload)?)),
            PacketKind::Unknown => Err(Error::UnknownTag {
                tag: String::from_utf8_lossy(&self.tag).into_owned(),
            }),
        }
    }
}

impl fmt::Display for RawPacket {
    /// 앞 8바이트만 미리보기로 출력
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview_len = self.payload.len().min(8);
        let preview = String::from_utf8_lossy(&self.payload[..preview_len]);
        let ellipsis = if self.payload.len() > 8 { "..." } else { "" };

        write!(
            f,
            "Packet {{ type={}, payload_size={}, payload='{}{}' }}",
            self.kind(),
            self.payload.len(),
            preview,
            ellipsis
        )
    }
}

fn utf8(payload: &[u8], what: &'static str) -> Result<String> {
    String::from_utf8(payload.to_vec()).map_err(|_| Error::InvalidUtf8 { what })
}

/// INFO 패킷 (송신자 → 수신자, 파일 메타데이터)
///
/// bincode 기본 설정(고정 길이 정수, 리틀 엔디언)으로 28바이트가 그대로 나옴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoPacket {
    /// 원본 파일 다이제스트
    pub digest: Digest,

    /// 원본 파일 크기
    pub file_size: u32,

    /// 블록 최대 크기
    pub max_block_size: u32,

    /// 총 블록 수
    pub block_count: u32,
}

impl InfoPacket {
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < INFO_PAYLOAD_LEN {
            return Err(Error::MalformedFrame {
                what: "info",
                needed: INFO_PAYLOAD_LEN,
                got: bytes.len(),
            });
        }
        Ok(bincode::deserialize(&bytes[..INFO_PAYLOAD_LEN])?)
    }
}

/// 타입이 지정된 패킷
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// 수신 확인 (메시지 = 페이로드 전체)
    Ack { message: String },

    /// 연결 종료
    Bye,

    /// 파일 요청 (파일 이름 = 페이로드 전체)
    RequestFile { filename: String },

    /// 블록 요청
    RequestBlock { number: BlockNumber },

    /// 파일 메타데이터
    Info(InfoPacket),

    /// 블록 데이터
    Send(Block),
}

impl Packet {
    pub fn ack(message: impl Into<String>) -> Self {
        Packet::Ack {
            message: message.into(),
        }
    }

    pub fn request_file(filename: impl Into<String>) -> Self {
        Packet::RequestFile {
            filename: filename.into(),
        }
    }

    pub fn request_block(number: BlockNumber) -> Self {
        Packet::RequestBlock { number }
    }

    /// 패킷 종류
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Ack { .. } => PacketKind::Ack,
            Packet::Bye => PacketKind::Bye,
            Packet::RequestFile { .. } => PacketKind::RequestFile,
            Packet::RequestBlock { .. } => PacketKind::RequestBlock,
            Packet::Info(_) => PacketKind::Info,
            Packet::Send(_) => PacketKind::Send,
        }
    }

    /// 일반 프레임으로 변환
    pub fn to_raw(&self) -> RawPacket {
        let payload = match self {
            Packet::Ack { message } => Bytes::copy_from_slice(message.as_bytes()),
            Packet::Bye => Bytes::new(),
            Packet::RequestFile { filename } => Bytes::copy_from_slice(filename.as_bytes()),
            Packet::RequestBlock { number } => {
                let mut buf = BytesMut::with_capacity(4);
                buf.put_u32_le(*number);
                buf.freeze()
            }
            Packet::Info(info) => Bytes::from(info.to_bytes()),
            Packet::Send(block) => {
                let mut buf = BytesMut::with_capacity(block.encoded_len());
                block.encode_into(&mut buf);
                buf.freeze()
            }
        };

        // 닫힌 집합의 종류이므로 태그는 항상 존재
        let tag = self.kind().tag().unwrap_or(*b"????");
        RawPacket::new(tag, payload)
    }

    /// 패킷을 바이트로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_raw().to_bytes()
    }

    /// 바이트에서 패킷 역직렬화
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        RawPacket::from_bytes(bytes)?.decode()
    }
}
