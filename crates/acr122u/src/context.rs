//! Reader context: session lifecycle and the dispatch loop

use std::fmt;
use std::panic;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use pcsc::State;
use tracing::{Dispatch, debug, error, info};

use crate::cancel::CancellationToken;
use crate::card::Card;
use crate::config::{Config, Protocol, ShareMode};
use crate::engine::PollingEngine;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::logging::{self, StateFlags};
use crate::service::{self, CardService};
use crate::state::{Payload, ReaderRecord};

/// An established middleware session and the readers it watches
///
/// Created by [`Context::establish`], served with [`Context::serve`] and
/// torn down with [`Context::release`].
pub struct Context<S = pcsc::Context> {
    service: S,
    readers: Vec<String>,
    share_mode: ShareMode,
    protocol: Protocol,
    poll_interval: Duration,
    dispatch: Option<Dispatch>,
}

impl<S> fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("readers", &self.readers)
            .field("share_mode", &self.share_mode)
            .field("protocol", &self.protocol)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Establish a PC/SC session and enumerate its readers
    pub fn establish(config: Config) -> Result<Self> {
        let service =
            service::establish().map_err(|e| Error::pcsc("establish context error", e))?;
        Self::with_service(service, config)
    }
}

impl<S: CardService> Context<S> {
    /// Build a context on an already established session
    ///
    /// Fails if the session is not valid, the readers cannot be listed, or
    /// no reader is attached.
    pub fn with_service(service: S, config: Config) -> Result<Self> {
        service
            .is_valid()
            .map_err(|e| Error::pcsc("invalid context", e))?;
        let readers = service
            .list_readers()
            .map_err(|e| Error::pcsc("list readers error", e))?;
        if readers.is_empty() {
            return Err(Error::NoReadersAvailable);
        }

        let Config {
            share_mode,
            protocol,
            poll_interval,
            log_level,
            log_output,
        } = config;

        Ok(Self {
            service,
            readers,
            share_mode,
            protocol,
            poll_interval,
            dispatch: logging::dispatch(log_level, log_output),
        })
    }

    /// Readers watched by [`Context::serve`]
    pub const fn readers(&self) -> &[String] {
        self.readers.as_slice()
    }

    /// Replace the watched readers, e.g. to restrict serving to one reader
    pub fn set_readers(&mut self, readers: Vec<String>) {
        self.readers = readers;
    }

    /// Sharing mode used for card connections
    pub const fn share_mode(&self) -> ShareMode {
        self.share_mode
    }

    /// Protocol used for card connections
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Bound on each blocking wait
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Tear down the middleware session
    pub fn release(self) -> Result<()> {
        self.service
            .release()
            .map_err(|e| Error::pcsc("release context error", e))
    }
}

impl<S: CardService + Sync> Context<S> {
    /// Serve presented cards to `handler` until `cancel` fires
    ///
    /// Polling runs on a scoped thread while this thread drains its queue
    /// and calls `handler`. Cancellation is noticed within one poll
    /// interval, after any card read already in progress. Returns the error
    /// that stopped polling, or `Ok(())` on cancellation. A panic in
    /// `handler` stops polling and is resumed on this thread.
    pub fn serve<H: Handler>(
        &mut self,
        cancel: &CancellationToken,
        mut handler: H,
    ) -> Result<()> {
        if self.readers.is_empty() {
            return Err(Error::NoReadersAvailable);
        }

        let engine_cancel = cancel.child_token();
        let (sender, receiver) = bounded(1);
        let engine = PollingEngine::new(
            &self.service,
            &self.readers,
            self.share_mode,
            self.protocol,
            self.poll_interval,
        );
        let dispatch = self.dispatch.as_ref();

        thread::scope(|scope| {
            let polling = scope.spawn(|| {
                logging::in_scope(dispatch, || engine.run(&engine_cancel, sender))
            });

            let served = logging::in_scope(dispatch, || {
                // Stops the engine however dispatch ends, a panicking handler included
                let _stop_engine = engine_cancel.drop_guard();
                let served = dispatch_transitions(receiver, &mut handler);
                if let Err(e) = &served {
                    error!(error = %e, "Stopping serve");
                }
                served
            });

            let polled = polling
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
            served.and(polled)
        })
    }

    /// Serve presented cards to a closure until `cancel` fires
    pub fn serve_fn<F>(&mut self, cancel: &CancellationToken, f: F) -> Result<()>
    where
        F: FnMut(&Card),
    {
        self.serve(cancel, f)
    }
}

/// Drain transitions until the engine closes the queue
///
/// Owns the receiver so the engine's next send fails however this returns.
fn dispatch_transitions<H: Handler>(
    receiver: Receiver<ReaderRecord>,
    handler: &mut H,
) -> Result<()> {
    for mut record in receiver {
        info!(
            reader = record.name(),
            current = %StateFlags(record.current_state()),
            event = %StateFlags(record.event_state()),
            "Signal received"
        );

        let present = record.event_state().contains(State::PRESENT);
        match record.take_payload() {
            Payload::Card(card) if present => {
                debug!(reader = card.reader(), uid = %card, "Handling card");
                handler.serve_card(&card);
            }
            Payload::Card(card) => {
                error!(reader = card.reader(), uid = %card, "Unhandled card data");
                return Err(Error::UnhandledCardData {
                    reader: record.name().to_string(),
                });
            }
            Payload::Empty => {}
        }
    }
    Ok(())
}
