//! Listener and producer records.
//!
//! A record owns every attachment made on behalf of one listener or producer
//! id. Dropping the record is the only way an attachment is released, and
//! [`Detach::detach`] is the only code that removes a slot from a registry.

use std::any::{TypeId, type_name};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::id::{ListenerId, ProducerId};
use crate::registry::{Side, SlotId, TypeRegistry, panic_message};

/// A registration that can be retracted from its registry.
pub(crate) trait Detach: Send + Sync {
    /// Remove the slot from its registry. Unknown slots are ignored.
    fn detach(&self);

    /// Identity of the registration: event type, side, and slot.
    fn key(&self) -> (TypeId, Side, SlotId);
}

/// One handler or generator slot in a `TypeRegistry<E>`.
pub(crate) struct Attachment<E: 'static> {
    registry: Arc<TypeRegistry<E>>,
    side: Side,
    slot: SlotId,
}

impl<E: 'static> Attachment<E> {
    pub(crate) fn handler(registry: Arc<TypeRegistry<E>>, slot: SlotId) -> Self {
        Self {
            registry,
            side: Side::Handlers,
            slot,
        }
    }

    pub(crate) fn generator(registry: Arc<TypeRegistry<E>>, slot: SlotId) -> Self {
        Self {
            registry,
            side: Side::Generators,
            slot,
        }
    }
}

impl<E: 'static> Detach for Attachment<E> {
    fn detach(&self) {
        // The removed callable is dropped here, after the registry lock has
        // been released, so its destructor may re-enter the bus.
        match self.side {
            Side::Handlers => drop(self.registry.remove_handler(self.slot)),
            Side::Generators => drop(self.registry.remove_generator(self.slot)),
        }
    }

    fn key(&self) -> (TypeId, Side, SlotId) {
        (TypeId::of::<E>(), self.side, self.slot)
    }
}

impl<E: 'static> fmt::Debug for Attachment<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("event_type", &type_name::<E>())
            .field("side", &self.side)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Aggregate owner of the attachments registered under one id.
pub(crate) struct Record<Id: fmt::Display + Copy> {
    id: Id,
    attachments: Vec<Box<dyn Detach>>,
}

/// Handlers registered under one [`ListenerId`].
pub(crate) type ListenerRecord = Record<ListenerId>;

/// Generators registered under one [`ProducerId`].
pub(crate) type ProducerRecord = Record<ProducerId>;

impl<Id: fmt::Display + Copy> Record<Id> {
    pub(crate) fn new(id: Id) -> Self {
        Self {
            id,
            attachments: Vec::new(),
        }
    }

    /// Take ownership of `attachment`. Returns `false` (and detaches nothing)
    /// if the exact same registration is already owned.
    #[must_use]
    pub(crate) fn add(&mut self, attachment: Box<dyn Detach>) -> bool {
        let key = attachment.key();
        if self.attachments.iter().any(|a| a.key() == key) {
            return false;
        }
        self.attachments.push(attachment);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.attachments.len()
    }
}

impl<Id: fmt::Display + Copy> Drop for Record<Id> {
    fn drop(&mut self) {
        // Every attachment is detached even if a released callable panics in
        // its destructor; the first such panic is re-raised afterwards.
        let released = self.attachments.len();
        let mut first_panic = None;
        for attachment in self.attachments.drain(..) {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| attachment.detach())) {
                warn!(
                    owner = %self.id,
                    panic = panic_message(payload.as_ref()),
                    "Released callable panicked on drop"
                );
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }
        debug!(owner = %self.id, released, "Record released");

        if let Some(payload) = first_panic
            && !std::thread::panicking()
        {
            resume_unwind(payload);
        }
    }
}

impl<Id: fmt::Display + Copy> fmt::Debug for Record<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id.to_string())
            .field("attachments", &self.attachments.len())
            .finish()
    }
}
