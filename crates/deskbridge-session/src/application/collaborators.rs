//! Seams to the components that sit around a session.
//!
//! - [`HypervisorController`] answers whether the VM is up; connecting is
//!   refused while it is not.
//! - [`DisplaySink`] is the host's display/audio output.  It never talks to
//!   the session directly: [`attach_display_sink`] wires it to the event
//!   dispatcher.

use std::sync::Arc;

use deskbridge_core::Frame;

use super::dispatcher::EventDispatcher;
use crate::domain::{EventKind, SessionEvent};

#[cfg_attr(test, mockall::automock)]
pub trait HypervisorController: Send + Sync {
    fn is_running(&self) -> bool;
}

pub trait DisplaySink: Send + Sync + 'static {
    fn on_frame(&self, frame: Arc<Frame>) -> anyhow::Result<()>;

    fn on_audio(&self, pcm: Arc<Vec<u8>>) -> anyhow::Result<()> {
        let _ = pcm;
        Ok(())
    }
}

/// Registers `sink` as the `screen_update` and `audio_chunk` handler.
pub fn attach_display_sink(dispatcher: &EventDispatcher, sink: Arc<dyn DisplaySink>) {
    let frames = sink.clone();
    dispatcher.register(EventKind::ScreenUpdate, move |event| match event {
        SessionEvent::ScreenUpdate(frame) => frames.on_frame(frame),
        _ => Ok(()),
    });
    dispatcher.register(EventKind::AudioChunk, move |event| match event {
        SessionEvent::AudioChunk(pcm) => sink.on_audio(pcm),
        _ => Ok(()),
    });
}
