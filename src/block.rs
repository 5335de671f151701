//! 블록 정의
//!
//! - Block: 압축 스트림을 고정 크기로 자른 조각, 재전송 단위
//! - 와이어 포맷: number(4, LE) || data(가변)

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// 블록 번호 (1부터 시작, 빈틈 없음)
pub type BlockNumber = u32;

/// 블록 헤더 길이 (번호 필드)
pub const BLOCK_HEADER_LEN: usize = 4;

/// 블록 (SEND 패킷의 페이로드)
///
/// 인코딩/디코딩 시 한 번 만들어진 뒤로는 수정하지 않음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// 블록 번호
    pub number: BlockNumber,

    /// 실제 데이터
    pub data: Bytes,
}

impl Block {
    /// 새 블록 생성
    pub fn new(number: BlockNumber, data: Bytes) -> Self {
        Self { number, data }
    }

    /// 인코딩된 크기
    pub fn encoded_len(&self) -> usize {
        BLOCK_HEADER_LEN + self.data.len()
    }

    /// 블록을 바이트로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// 버퍼 뒤에 블록을 이어 붙임
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.number);
        buf.put_slice(&self.data);
    }

    /// 바이트에서 블록 역직렬화
    ///
    /// 번호 뒤의 나머지(빈 경우 포함)는 그대로 데이터가 됨
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_LEN {
            return Err(Error::MalformedFrame {
                what: "block",
                needed: BLOCK_HEADER_LEN,
                got: bytes.len(),
            });
        }

        let number = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let data = Bytes::copy_from_slice(&bytes[BLOCK_HEADER_LEN..]);

        Ok(Self { number, data })
    }
}

/// 블록 생성기 (송신측)
pub struct BlockBuilder {
    max_block_size: usize,
}

impl BlockBuilder {
    pub fn new(max_block_size: usize) -> Self {
        Self {
            max_block_size: max_block_size.max(1),
        }
    }

    /// 압축된 스트림을 블록들로 분할
    ///
    /// 마지막 블록만 짧을 수 있고, 번호는 1부터 연속
    pub fn split_into_blocks(&self, data: &[u8]) -> Vec<Block> {
        let data = Bytes::copy_from_slice(data);

        (0..data.len())
            .step_by(self.max_block_size)
            .enumerate()
            .map(|(idx, offset)| {
                let end = (offset + self.max_block_size).min(data.len());
                Block::new(idx as BlockNumber + 1, data.slice(offset..end))
            })
            .collect()
    }

    /// 주어진 크기를 나누는 데 필요한 블록 수
    pub fn block_count(&self, len: usize) -> usize {
        (len + self.max_block_size - 1) / self.max_block_size
    }
}
