//! 블록 요청 추적 (수신측)
//!
//! - 요청 큐(FIFO)에서 틱마다 하나씩 꺼내 REQB 전송
//! - 큐가 비었는데 아직 다 못 받았으면 누락 블록을 다시 큐에 넣음
//! - 타이머 없음: 재요청은 큐가 빌 때만 발생

use std::collections::{BTreeMap, VecDeque};

use bytes::{Bytes, BytesMut};

use crate::block::{Block, BlockNumber};

/// 한 번의 전송에서 추적할 수 있는 최대 블록 수
pub const MAX_BLOCK_COUNT: u32 = 1 << 24;

/// 블록 삽입 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// 새 블록 저장
    Accepted,

    /// 이미 받은 블록
    Duplicate,

    /// 1..=block_count 범위 밖
    OutOfRange,
}

/// 블록 요청 추적기
#[derive(Debug, Default)]
pub struct RequestTracker {
    /// 예상 블록 수
    block_count: u32,

    /// 요청 대기 큐
    queue: VecDeque<BlockNumber>,

    /// 수신된 블록 (번호순 정렬)
    received: BTreeMap<BlockNumber, Block>,

    /// 지금까지 발행한 요청 수 (재요청 포함)
    total_requested: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 전송 단계 진입: 1..=block_count를 한 번씩 큐에 넣음
    ///
    /// 호출자가 `MAX_BLOCK_COUNT` 이하로 제한해야 함
    pub fn seed(&mut self, block_count: u32) {
        self.reset();
        self.block_count = block_count;
        self.queue.extend(1..=block_count);
    }

    /// 이번 틱에 요청할 블록 번호 (최대 하나)
    pub fn next_request(&mut self) -> Option<BlockNumber> {
        let number = self.queue.pop_front()?;
        self.total_requested += 1;
        Some(number)
    }

    /// 수신 블록 저장
    ///
    /// 범위 밖이거나 이미 받은 번호는 무시
    pub fn insert(&mut self, block: Block) -> Insertion {
        if block.number == 0 || block.number > self.block_count {
            return Insertion::OutOfRange;
        }
        if self.received.contains_key(&block.number) {
            return Insertion::Duplicate;
        }

        self.received.insert(block.number, block);
        Insertion::Accepted
    }

    /// 큐가 비었고 아직 완료되지 않았으면 받지 못한 번호를 모두 다시 큐에 넣음
    ///
    /// 다시 넣은 개수 반환
    pub fn requeue_missing(&mut self) -> usize {
        if !self.queue.is_empty() || self.is_complete() {
            return 0;
        }

        let missing: Vec<BlockNumber> = self.missing_blocks().collect();
        self.queue.extend(missing.iter().copied());
        missing.len()
    }

    /// 받지 못한 블록 번호
    pub fn missing_blocks(&self) -> impl Iterator<Item = BlockNumber> + '_ {
        (1..=self.block_count).filter(move |n| !self.received.contains_key(n))
    }

    /// 완료 여부: 받은 블록 수 == 예상 블록 수
    pub fn is_complete(&self) -> bool {
        self.received.len() == self.block_count as usize
    }

    /// 수신 블록을 번호순으로 이어 붙임
    pub fn reassemble(&self) -> Bytes {
        let total: usize = self.received.values().map(|b| b.data.len()).sum();
        let mut buf = BytesMut::with_capacity(total);
        for block in self.received.values() {
            buf.extend_from_slice(&block.data);
        }
        buf.freeze()
    }

    /// 상태 초기화
    pub fn reset(&mut self) {
        self.block_count = 0;
        self.queue.clear();
        self.received.clear();
        self.total_requested = 0;
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    pub fn total_requested(&self) -> u64 {
        self.total_requested
    }

    /// 성공률: 블록 수 / 발행한 요청 수
    pub fn success_ratio(&self) -> f64 {
        if self.total_requested == 0 {
            return 0.0;
        }
        self.block_count as f64 / self.total_requested as f64
    }

    /// 큐 내용 (테스트/진단용)
    pub fn queued(&self) -> impl Iterator<Item = &BlockNumber> {
        self.queue.iter()
    }
}
