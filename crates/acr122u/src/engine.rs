//! Polling engine: bounded waits, transition detection and card reads

use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, error, trace};

use crate::cancel::CancellationToken;
use crate::card::read_card;
use crate::config::{Protocol, ShareMode};
use crate::error::{Error, Result};
use crate::service::CardService;
use crate::state::{Payload, ReaderRecord, ReaderStateTable};

/// Drives the wait, diff, read, emit cycle for one serve call
#[derive(Debug)]
pub(crate) struct PollingEngine<'a, S> {
    service: &'a S,
    share_mode: ShareMode,
    protocol: Protocol,
    poll_interval: Duration,
    table: ReaderStateTable,
}

impl<'a, S: CardService> PollingEngine<'a, S> {
    pub(crate) fn new<R: AsRef<str>>(
        service: &'a S,
        readers: &[R],
        share_mode: ShareMode,
        protocol: Protocol,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            share_mode,
            protocol,
            poll_interval,
            table: ReaderStateTable::new(readers),
        }
    }

    /// Run until cancelled, the receiver goes away, or a fatal error
    ///
    /// Every changed record is sent in table order. Dropping `results` on
    /// return closes the queue for the dispatch side.
    pub(crate) fn run(
        mut self,
        cancel: &CancellationToken,
        results: Sender<ReaderRecord>,
    ) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                debug!("Cancelled before wait");
                return Ok(());
            }

            match self.wait_for_status_change(cancel) {
                Ok(()) => {}
                Err(Error::Shutdown) => {
                    debug!("Cancelled during wait");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "Problem waiting for status change");
                    return Err(e);
                }
            }

            for record in self.table.records_mut() {
                if !record.has_changed() {
                    continue;
                }

                if record.is_presence_transition() {
                    debug!(reader = record.name(), "Card present");
                    let card = read_card(
                        self.service,
                        record.name(),
                        self.share_mode,
                        self.protocol,
                    )
                    .inspect_err(|e| {
                        error!(reader = record.name(), error = %e, "Problem reading card data");
                    })?;
                    record.set_payload(card.map_or(Payload::Empty, Payload::Card));
                }

                if results.send(record.clone()).is_err() {
                    debug!("Receiver gone, stopping");
                    return Ok(());
                }
                record.settle();
            }
        }
    }

    /// Block until a reader changes, retrying each elapsed poll quantum
    ///
    /// Returns [`Error::Shutdown`] as soon as a wait returns with `cancel`
    /// set, whatever the wait reported.
    fn wait_for_status_change(&mut self, cancel: &CancellationToken) -> Result<()> {
        debug!("Waiting for status to change");
        loop {
            let result = self
                .service
                .get_status_change(self.table.records_mut(), self.poll_interval);
            if cancel.is_cancelled() {
                return Err(Error::Shutdown);
            }

            match result.map_err(|e| Error::pcsc("error waiting for status change", e)) {
                Ok(()) => {
                    trace!("Got signal");
                    return Ok(());
                }
                Err(e) if e.is_timeout() => {
                    trace!(error = %e, "Handled timeout");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
