//! Line protocol shared by server and client.
//!
//! Every message is one UTF-8 line of the form `PREFIX` or `PREFIX:payload`.
//! Entity lists are `;`-separated entries, each entry a fixed-order,
//! `,`-separated record:
//!
//! | entity  | fields                                   |
//! |---------|------------------------------------------|
//! | player  | `id,x,y,direction,state`                 |
//! | chicken | `id,x,y,health,state`                    |
//! | portal  | `id,x,y,targetX,targetY,targetPortalId`  |
//!
//! The field order is part of [`PROTOCOL_VERSION`]; changing it means
//! bumping the version.

use crate::{
    ChickenId, ChickenSnapshot, Direction, PlayerId, PlayerSnapshot, PortalSnapshot,
};
use std::str::FromStr;
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;

const ENTRY_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown message prefix in {0:?}")]
    UnknownPrefix(String),
    #[error("{entity} entry has {found} fields, expected {expected}")]
    FieldCount {
        entity: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid number {value:?} for {field}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid direction {0:?}")]
    InvalidDirection(String),
    #[error("invalid state {0:?}")]
    InvalidState(String),
    #[error("invalid id {0:?}")]
    InvalidId(String),
}

/// A record that travels as one `,`-separated entry.
pub trait Entry: Sized {
    const NAME: &'static str;
    const FIELDS: usize;

    fn write_entry(&self, out: &mut String);
    fn from_fields(fields: &[&str]) -> Result<Self, DecodeError>;

    fn encode_entry(&self) -> String {
        let mut out = String::new();
        self.write_entry(&mut out);
        out
    }

    fn decode_entry(entry: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = entry.split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() != Self::FIELDS {
            return Err(DecodeError::FieldCount {
                entity: Self::NAME,
                expected: Self::FIELDS,
                found: fields.len(),
            });
        }
        Self::from_fields(&fields)
    }
}

fn number<T: FromStr>(field: &'static str, value: &str) -> Result<T, DecodeError> {
    value.parse().map_err(|_| DecodeError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl Entry for PlayerSnapshot {
    const NAME: &'static str = "player";
    const FIELDS: usize = 5;

    fn write_entry(&self, out: &mut String) {
        out.push_str(&format!(
            "{},{},{},{},{}",
            self.id,
            self.x,
            self.y,
            self.direction,
            self.state.as_str()
        ));
    }

    fn from_fields(fields: &[&str]) -> Result<Self, DecodeError> {
        Ok(PlayerSnapshot {
            id: fields[0].parse()?,
            x: number("x", fields[1])?,
            y: number("y", fields[2])?,
            direction: fields[3].parse()?,
            state: fields[4].parse()?,
        })
    }
}

impl Entry for ChickenSnapshot {
    const NAME: &'static str = "chicken";
    const FIELDS: usize = 5;

    fn write_entry(&self, out: &mut String) {
        out.push_str(&format!(
            "{},{},{},{},{}",
            self.id,
            self.x,
            self.y,
            self.health,
            self.state.as_str()
        ));
    }

    fn from_fields(fields: &[&str]) -> Result<Self, DecodeError> {
        Ok(ChickenSnapshot {
            id: fields[0].parse()?,
            x: number("x", fields[1])?,
            y: number("y", fields[2])?,
            health: number("health", fields[3])?,
            state: fields[4].parse()?,
        })
    }
}

impl Entry for PortalSnapshot {
    const NAME: &'static str = "portal";
    const FIELDS: usize = 6;

    fn write_entry(&self, out: &mut String) {
        out.push_str(&format!(
            "{},{},{},{},{},{}",
            self.id, self.x, self.y, self.target_x, self.target_y, self.target_id
        ));
    }

    fn from_fields(fields: &[&str]) -> Result<Self, DecodeError> {
        Ok(PortalSnapshot {
            id: fields[0].parse()?,
            x: number("x", fields[1])?,
            y: number("y", fields[2])?,
            target_x: number("targetX", fields[3])?,
            target_y: number("targetY", fields[4])?,
            target_id: fields[5].parse()?,
        })
    }
}

pub fn encode_list<T: Entry>(entries: &[T]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push(ENTRY_SEPARATOR);
        }
        entry.write_entry(&mut out);
    }
    out
}

/// Decodes a `;`-separated list. An empty payload is an empty list.
pub fn decode_list<T: Entry>(payload: &str) -> Result<Vec<T>, DecodeError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    payload
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.trim().is_empty())
        .map(T::decode_entry)
        .collect()
}

/// Splits `PREFIX:payload`. A line without `:` is a bare prefix.
fn split_line(line: &str) -> (&str, Option<&str>) {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.split_once(':') {
        Some((prefix, payload)) => (prefix, Some(payload)),
        None => (line.trim(), None),
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Id(PlayerId),
    Version(u32),
    Players(Vec<PlayerSnapshot>),
    Portals(Vec<PortalSnapshot>),
    Chickens(Vec<ChickenSnapshot>),
    ChickenUpdate(ChickenSnapshot),
    Money(i64),
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::Id(id) => format!("ID:{}", id),
            ServerMessage::Version(version) => format!("VERSION:{}", version),
            ServerMessage::Players(players) => format!("PLAYERS:{}", encode_list(players)),
            ServerMessage::Portals(portals) => format!("PORTALS:{}", encode_list(portals)),
            ServerMessage::Chickens(chickens) => format!("CHICKENS:{}", encode_list(chickens)),
            ServerMessage::ChickenUpdate(chicken) => {
                format!("CHICKEN_UPDATE:{}", chicken.encode_entry())
            }
            ServerMessage::Money(amount) => format!("MONEY:{}", amount),
        }
    }

    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let (prefix, payload) = split_line(line);
        let payload = payload.unwrap_or("");
        match prefix {
            "ID" => Ok(ServerMessage::Id(payload.trim().parse()?)),
            "VERSION" => Ok(ServerMessage::Version(number("version", payload.trim())?)),
            "PLAYERS" => Ok(ServerMessage::Players(decode_list(payload)?)),
            "PORTALS" => Ok(ServerMessage::Portals(decode_list(payload)?)),
            "CHICKENS" => Ok(ServerMessage::Chickens(decode_list(payload)?)),
            "CHICKEN_UPDATE" => Ok(ServerMessage::ChickenUpdate(ChickenSnapshot::decode_entry(
                payload,
            )?)),
            "MONEY" => Ok(ServerMessage::Money(number("money", payload.trim())?)),
            _ => Err(DecodeError::UnknownPrefix(line.to_string())),
        }
    }
}

/// Messages a client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Move(Direction),
    Stop,
    Attack,
    Teleport,
    Money(i64),
    ChickenAttack(ChickenId),
}

impl ClientMessage {
    pub fn encode(&self) -> String {
        match self {
            ClientMessage::Move(direction) => format!("MOVE:{}", direction),
            ClientMessage::Stop => "STOP".to_string(),
            ClientMessage::Attack => "ATTACK".to_string(),
            ClientMessage::Teleport => "TELEPORT".to_string(),
            ClientMessage::Money(amount) => format!("MONEY:{}", amount),
            ClientMessage::ChickenAttack(id) => format!("CHICKEN_ATTACK:{}", id),
        }
    }

    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        match split_line(line) {
            ("MOVE", Some(direction)) => Ok(ClientMessage::Move(direction.trim().parse()?)),
            ("STOP", None) => Ok(ClientMessage::Stop),
            ("ATTACK", None) => Ok(ClientMessage::Attack),
            ("TELEPORT", None) => Ok(ClientMessage::Teleport),
            ("MONEY", Some(amount)) => Ok(ClientMessage::Money(number("money", amount.trim())?)),
            ("CHICKEN_ATTACK", Some(id)) => Ok(ClientMessage::ChickenAttack(id.trim().parse()?)),
            _ => Err(DecodeError::UnknownPrefix(line.to_string())),
        }
    }
}
