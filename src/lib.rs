// MazeTimer - Timing Core
//
// Micromouse maze timing rig: photo-gate detection, operator buttons, run
// stopwatches and the ASCII frame protocol spoken to the host application.
// Everything here is hardware-independent; the firmware binary supplies
// ESP-IDF pin drivers through the `hal` traits.

pub mod clock;
pub mod config;
pub mod controller;
pub mod events;
pub mod filters;
pub mod gate;
pub mod hal;
pub mod input;
pub mod monostable;
pub mod protocol;
pub mod replay;
pub mod stopwatch;
pub mod tasks;
pub mod timer;
