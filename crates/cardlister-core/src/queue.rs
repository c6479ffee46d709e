//! Upload queue
//!
//! Ordered collection of intake items for one session. Items are validated
//! before they are appended, so a rejected item never reaches the queue and a
//! rejection leaves the queue exactly as it was. Removal is stable: the
//! remaining items keep their relative order.

use chrono::Utc;

use crate::config::IntakeLimits;
use crate::error::{IntakeError, IntakeResult, RejectReason};
use crate::models::{IntakeItem, ItemId, QueuedItem};
use crate::validation::validate_item;

#[derive(Debug, Clone, Default)]
pub struct UploadQueue {
    items: Vec<QueuedItem>,
    limits: IntakeLimits,
}

impl UploadQueue {
    pub fn new(limits: IntakeLimits) -> Self {
        Self {
            items: Vec::new(),
            limits,
        }
    }

    pub fn limits(&self) -> &IntakeLimits {
        &self.limits
    }

    /// Validate and append an item, returning the identifier it was assigned.
    pub fn add_item(&mut self, item: impl Into<IntakeItem>) -> IntakeResult<ItemId> {
        if self.items.len() >= self.limits.max_items {
            return Err(IntakeError::ItemRejected(RejectReason::QueueFull {
                max_items: self.limits.max_items,
            }));
        }

        let item = validate_item(item.into(), &self.limits)?;
        let id = ItemId::new();
        tracing::debug!(
            item_id = %id,
            item_type = item.type_name(),
            label = %item.label(),
            position = self.items.len(),
            "Intake item accepted"
        );
        self.items.push(QueuedItem {
            id,
            item,
            added_at: Utc::now(),
        });
        Ok(id)
    }

    pub fn remove_item(&mut self, index: usize) -> IntakeResult<QueuedItem> {
        self.check_index(index)?;
        let removed = self.items.remove(index);
        tracing::debug!(item_id = %removed.id, index = index, "Intake item removed");
        Ok(removed)
    }

    pub fn remove_by_id(&mut self, id: ItemId) -> IntakeResult<QueuedItem> {
        let index = self.position_of(id).ok_or(IntakeError::ItemNotFound(id))?;
        self.remove_item(index)
    }

    /// Record a positive outcome from the lookup or recognition collaborator.
    /// For a certificate lookup this unblocks review; for a photo it records
    /// that the card was recognized. Marking twice is harmless.
    pub fn mark_validated(&mut self, index: usize) -> IntakeResult<()> {
        self.check_index(index)?;
        let queued = &mut self.items[index];
        match &mut queued.item {
            IntakeItem::CertificateLookup(lookup) => lookup.validated = true,
            IntakeItem::RawPhoto(photo) => photo.recognized = true,
        }
        tracing::debug!(item_id = %queued.id, index = index, "Intake item validated");
        Ok(())
    }

    pub fn mark_validated_by_id(&mut self, id: ItemId) -> IntakeResult<()> {
        let index = self.position_of(id).ok_or(IntakeError::ItemNotFound(id))?;
        self.mark_validated(index)
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|queued| queued.id == id)
    }

    /// Non-empty and no certificate lookup still awaiting confirmation
    pub fn is_ready_for_review(&self) -> bool {
        !self.items.is_empty() && !self.items.iter().any(|q| q.item.is_pending_lookup())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueuedItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[QueuedItem] {
        &self.items
    }

    /// Certificate lookups the external service has not confirmed yet
    pub fn pending_lookups(&self) -> impl Iterator<Item = &QueuedItem> {
        self.items.iter().filter(|q| q.item.is_pending_lookup())
    }

    pub fn total_photo_bytes(&self) -> u64 {
        self.items
            .iter()
            .filter_map(|q| match &q.item {
                IntakeItem::RawPhoto(photo) => Some(photo.size_bytes),
                IntakeItem::CertificateLookup(_) => None,
            })
            .sum()
    }

    /// Rebuild a queue from persisted items, re-checking each against the current limits.
    pub(crate) fn restore(items: Vec<QueuedItem>, limits: IntakeLimits) -> IntakeResult<Self> {
        if items.len() > limits.max_items {
            return Err(IntakeError::InvalidRecord(format!(
                "{} items exceed the limit of {}",
                items.len(),
                limits.max_items
            )));
        }

        let mut restored: Vec<QueuedItem> = Vec::with_capacity(items.len());
        for queued in items {
            if restored.iter().any(|q| q.id == queued.id) {
                return Err(IntakeError::InvalidRecord(format!(
                    "duplicate item id {}",
                    queued.id
                )));
            }
            let item = validate_item(queued.item, &limits).map_err(|reason| {
                IntakeError::InvalidRecord(format!("item {}: {}", queued.id, reason))
            })?;
            restored.push(QueuedItem { item, ..queued });
        }

        Ok(Self {
            items: restored,
            limits,
        })
    }

    fn check_index(&self, index: usize) -> IntakeResult<()> {
        if index >= self.items.len() {
            return Err(IntakeError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }
}
