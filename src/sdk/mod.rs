//! SDK Module - Schnittstelle zum Voice SDK
//!
//! Dieses Modul verwaltet:
//! - Capability-Traits für Device und Call
//! - Event-Typen beider Handles
//! - Loopback-Backend für lokale Tests ohne Telefonie-Account
//!

mod device;
mod loopback;

pub use device::{
    CallEvent, ConnectParams, DeviceEvent, DeviceFactory, DeviceOptions, SdkError, VoiceCall,
    VoiceDevice,
};
pub use loopback::{LoopbackDeviceFactory, LoopbackOptions};
