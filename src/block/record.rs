//! block/record — DynamicRecord.

/// Один блок цепочки.
///
/// `data.len()` — это `length` блока; `next == None` означает конец цепочки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRecord {
    pub id: u64,
    pub in_use: bool,
    pub start_of_chain: bool,
    pub next: Option<u64>,
    pub data: Vec<u8>,
}

impl DynamicRecord {
    /// Свободный (не используемый) блок с данным id.
    pub fn free(id: u64) -> Self {
        Self {
            id,
            in_use: false,
            start_of_chain: false,
            next: None,
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_chain_head(&self) -> bool {
        self.in_use && self.start_of_chain
    }

    /// Payload этого блока.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Пометить блок свободным: данные и ссылка сбрасываются.
    pub fn mark_free(&mut self) {
        self.in_use = false;
        self.start_of_chain = false;
        self.next = None;
        self.data.clear();
    }
}

/// Склеить payload цепочки в порядке следования блоков.
pub fn concat_data(records: &[DynamicRecord]) -> Vec<u8> {
    let total = records.iter().map(|r| r.data.len()).sum();
    let mut out = Vec::with_capacity(total);
    for r in records {
        out.extend_from_slice(&r.data);
    }
    out
}
