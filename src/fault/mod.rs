//! Fault injection.
//!
//! [`FaultController`] owns the only shared mutable state in the service:
//! the health flag, the leak buffer and the root-route request counter.
//! Handlers receive it through the router state and never touch the state
//! directly.
//!
//! # Faults
//!
//! - **Health toggle**: `/health` answers 503 while disabled
//! - **Memory leak**: retained blocks accumulate until explicitly cleared
//! - **CPU spike**: a busy-wait that never yields the calling thread

mod controller;
mod cpu;
mod leak;

pub use controller::{
    FaultController, DEFAULT_CPU_SPIKE, DEFAULT_LEAK_BLOCKS, DEFAULT_LEAK_BLOCK_SIZE,
};
pub use cpu::CpuBurn;
pub use leak::{LeakBlock, LeakBuffer};
