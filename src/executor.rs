//! Run-to-completion scheduler for the three active objects.
//!
//! Owns the supervisor, the appliance controller and the magnetron, plus
//! the power-level pipe they share, and a [`DisplaySink`] for outbound
//! display traffic. Host code feeds stimuli in with [`Executor::post`]
//! and drives virtual time with [`Executor::advance`]; nothing here
//! blocks or spawns threads.
//!
//! Routing rules: events addressed to a component land in its mailbox;
//! region-addressed events go to the region's owner (the microwave);
//! events addressed to the console are collected for the host to pick up
//! with [`Executor::take_console`]. Each drain pass gives every
//! component at most one dispatch before the next, so no component can
//! starve the others however busy its mailbox is.

use std::sync::Arc;

use crate::active::Outbox;
use crate::components::{Magnetron, Microwave, System};
use crate::config::SystemConfig;
use crate::display::DisplaySink;
use crate::event::{ComponentId, Event};
use crate::pipe::SlotPipe;
use crate::Result;

pub struct Executor<D: DisplaySink> {
    system: System,
    microwave: Microwave,
    magnetron: Magnetron,
    pipe: Arc<SlotPipe>,
    sink: D,
    console: Vec<Event>,
    outbox: Outbox,
}

impl<D: DisplaySink> Executor<D> {
    /// Build the component set and run every initial transition.
    pub fn new(config: &SystemConfig, sink: D) -> Result<Self> {
        config.validate()?;
        let pipe = Arc::new(SlotPipe::new());
        let mut exec = Self {
            system: System::new(config)?,
            microwave: Microwave::new(config, Arc::clone(&pipe))?,
            magnetron: Magnetron::new(config, Arc::clone(&pipe))?,
            pipe,
            sink,
            console: Vec::new(),
            outbox: Outbox::new(),
        };
        exec.system.init(&mut exec.outbox);
        exec.microwave.init(&mut exec.outbox);
        exec.magnetron.init(&mut exec.outbox);
        exec.route();
        Ok(exec)
    }

    /// Inject an external stimulus and settle the system.
    pub fn post(&mut self, event: Event) {
        self.deliver(event);
        self.run_until_idle();
    }

    /// Drain every mailbox, one event per component per pass, routing
    /// produced events until nothing moves.
    pub fn run_until_idle(&mut self) {
        loop {
            let mut moved = false;
            moved |= self.system.step(&mut self.outbox);
            moved |= self.microwave.step(&mut self.outbox);
            moved |= self.magnetron.step(&mut self.outbox);
            self.route();
            if !moved {
                break;
            }
        }
    }

    /// Advance virtual time: every component's timers first, then a full
    /// drain of whatever the expiries set in motion.
    pub fn advance(&mut self, elapsed_ms: u32) {
        self.system.advance(elapsed_ms);
        self.microwave.advance(elapsed_ms);
        self.magnetron.advance(elapsed_ms);
        self.run_until_idle();
    }

    /// Events the components addressed to the external console.
    pub fn take_console(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.console)
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn microwave(&self) -> &Microwave {
        &self.microwave
    }

    pub fn magnetron(&self) -> &Magnetron {
        &self.magnetron
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn pipe(&self) -> &SlotPipe {
        &self.pipe
    }

    fn deliver(&mut self, event: Event) {
        match event.to {
            ComponentId::System => self.system.post(event),
            ComponentId::Magnetron => self.magnetron.post(event),
            // Regions are owned by the microwave.
            ComponentId::Microwave
            | ComponentId::Fan
            | ComponentId::Lamp
            | ComponentId::Turntable => self.microwave.post(event),
            ComponentId::Console => self.console.push(event),
        }
    }

    fn route(&mut self) {
        let (events, display) = self.outbox.take();
        for event in events {
            self.deliver(event);
        }
        for msg in display {
            self.sink.send(&msg);
        }
    }
}
