// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Host-side packet capabilities.
//!
//! The host's network stack owns the real packet types. It exposes just
//! enough of them through [`OutgoingPacket`] and [`IncomingPacket`] for the
//! channel to read and rewrite the two rotation fields, and answers peer
//! visibility queries through [`PeerView`].
//!
//! [`PlayerRotation`] and [`EntityRotation`] are plain owned packets for
//! hosts that decode into structs first, and for simulations.

use crate::stego::codec::{to_wire, WireValue};
use crate::stego::error::StegoError;
use crate::stego::telemetry::PacketClass;

/// Packet discriminant as far as the channel cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Outgoing rotation-only update.
    Rotation,
    /// Outgoing position + rotation update.
    PositionRotation,
    /// Incoming relative move (may carry rotation).
    EntityMove,
    /// Incoming rotation-only update.
    EntityLook,
    Other,
}

impl PacketKind {
    /// Outgoing packets the embedder may rewrite.
    pub fn is_embeddable(self) -> bool {
        matches!(self, Self::Rotation | Self::PositionRotation)
    }

    /// Incoming packets the extractor reads.
    pub fn is_extractable(self) -> bool {
        matches!(self, Self::EntityMove | Self::EntityLook)
    }
}

/// What the channel did with one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Channel disabled by config; packet untouched.
    Disabled,
    /// Peer absent; channel state was reset.
    PeerNotVisible,
    /// Not a packet type (or source) this role handles.
    Ineligible,
    /// Warm-up still running; packet untouched.
    Warmup,
    /// Packet was consumed by the framing state machine.
    Processed(PacketClass),
}

/// Pitch and yaw in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Angles {
    pub pitch: f32,
    pub yaw: f32,
}

impl Angles {
    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    /// Wire values `(pitch, yaw)` these angles quantize to.
    pub fn to_wire(self) -> (WireValue, WireValue) {
        (to_wire(self.pitch), to_wire(self.yaw))
    }
}

/// Outgoing packet whose rotation fields can be rewritten in place.
pub trait OutgoingPacket {
    fn kind(&self) -> PacketKind;

    /// Current rotation, or `None` if this packet has no rotation fields.
    fn angles(&self) -> Option<Angles>;

    /// Overwrite both rotation fields.
    fn set_angles(&mut self, angles: Angles) -> Result<(), StegoError>;
}

/// Incoming packet as received from the server.
pub trait IncomingPacket {
    fn kind(&self) -> PacketKind;

    /// Display name of the entity this packet is about, if resolvable.
    fn source(&self) -> Option<&str>;

    /// Quantized `(pitch, yaw)`, or `None` if absent.
    fn wire_angles(&self) -> Option<(WireValue, WireValue)>;
}

/// Answers whether a named peer is currently present in the session.
pub trait PeerView {
    fn is_visible(&self, name: &str) -> bool;
}

impl<F: Fn(&str) -> bool> PeerView for F {
    fn is_visible(&self, name: &str) -> bool {
        self(name)
    }
}

/// Owned outgoing rotation update.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRotation {
    pub kind: PacketKind,
    pub angles: Option<Angles>,
}

impl PlayerRotation {
    pub fn look(pitch: f32, yaw: f32) -> Self {
        Self { kind: PacketKind::Rotation, angles: Some(Angles::new(pitch, yaw)) }
    }

    pub fn move_and_look(pitch: f32, yaw: f32) -> Self {
        Self { kind: PacketKind::PositionRotation, angles: Some(Angles::new(pitch, yaw)) }
    }
}

impl OutgoingPacket for PlayerRotation {
    fn kind(&self) -> PacketKind {
        self.kind
    }

    fn angles(&self) -> Option<Angles> {
        self.angles
    }

    fn set_angles(&mut self, angles: Angles) -> Result<(), StegoError> {
        match self.angles.as_mut() {
            Some(slot) => {
                *slot = angles;
                Ok(())
            }
            None => Err(StegoError::AnglesUnwritable),
        }
    }
}

/// Owned incoming entity update.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRotation {
    pub kind: PacketKind,
    pub source: Option<String>,
    pub pitch: WireValue,
    pub yaw: WireValue,
}

impl EntityRotation {
    pub fn look(source: &str, pitch: WireValue, yaw: WireValue) -> Self {
        Self { kind: PacketKind::EntityLook, source: Some(source.to_string()), pitch, yaw }
    }

    /// What the server relays after quantizing an outgoing rotation.
    pub fn relayed(source: &str, angles: Angles) -> Self {
        let (pitch, yaw) = angles.to_wire();
        Self::look(source, pitch, yaw)
    }
}

impl IncomingPacket for EntityRotation {
    fn kind(&self) -> PacketKind {
        self.kind
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn wire_angles(&self) -> Option<(WireValue, WireValue)> {
        Some((self.pitch, self.yaw))
    }
}
