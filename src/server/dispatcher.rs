//! Server dispatcher: drives one accepted connection's link state
//! machine, answers the STARTDT/STOPDT handshake, and branches on
//! incoming I-frames: single/setpoint commands and General
//! Interrogation.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::apci::Apci;
use crate::asdu::{Asdu, AsduHeader};
use crate::constant::{STARTDT_ACT, STOPDT_ACT};
use crate::error::{BadFrameReason, Error};
use crate::link::{read_frame, write_frame, Link};
use crate::registry::Registry;
use crate::types::{Cot, TypeId};

/// Delay applied between ASDUs within an interrogation response burst,
/// so naive clients are not overrun.
pub const INTERROGATION_INTER_FRAME_DELAY: Duration = Duration::from_millis(50);

/// Byte offset of the COT field within an encoded ASDU.
const COT_OFFSET: usize = 2;

pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Dispatcher { registry }
    }

    /// Drive one connection until the peer closes the socket or sends
    /// something the link state machine rejects.
    pub fn run(&self, mut stream: TcpStream) -> Result<(), Error> {
        let mut link = Link::new();
        loop {
            let frame = match read_frame(&mut stream) {
                Ok(f) => f,
                Err(Error::Io(_)) | Err(Error::Timeout) => return Ok(()),
                Err(Error::BadFrame(reason)) => {
                    log::warn!("dropping malformed frame: {}", reason);
                    continue;
                }
                Err(e) => return Err(e),
            };
            match frame {
                Apci::U(ctrl) => self.handle_u(&mut stream, &mut link, ctrl)?,
                Apci::S => {}
                Apci::I { asdu, .. } => {
                    link.note_received();
                    link.require_started()?;
                    match self.handle_asdu(&mut stream, &mut link, &asdu) {
                        Ok(()) => {}
                        Err(Error::BadFrame(reason)) => {
                            log::warn!("dropping malformed ASDU: {}", reason);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    fn handle_u(&self, stream: &mut TcpStream, link: &mut Link, ctrl: u8) -> Result<(), Error> {
        match ctrl {
            STARTDT_ACT => {
                link.start();
                write_frame(stream, &Apci::startdt_con())
            }
            STOPDT_ACT => {
                link.stop();
                write_frame(stream, &Apci::stopdt_con())
            }
            _ => Ok(()),
        }
    }

    fn handle_asdu(&self, stream: &mut TcpStream, link: &mut Link, bytes: &[u8]) -> Result<(), Error> {
        match Asdu::decode(bytes) {
            Ok(asdu) => match asdu.type_id {
                TypeId::Interrogation => self.handle_interrogation(stream, link, asdu.casdu),
                TypeId::SingleCommand | TypeId::SetpointCommand => {
                    self.handle_command(stream, link, &asdu, bytes)
                }
                TypeId::SinglePoint | TypeId::ShortFloat => Ok(()), // never sent upstream
            },
            Err(Error::BadFrame(BadFrameReason::UnknownType(_))) => {
                let header = AsduHeader::decode(bytes)?;
                self.reply_mirrored(stream, link, bytes, header, Cot::UnknownIoa)
            }
            Err(e) => Err(e),
        }
    }

    fn handle_command(
        &self,
        stream: &mut TcpStream,
        link: &mut Link,
        asdu: &Asdu,
        bytes: &[u8],
    ) -> Result<(), Error> {
        let value = asdu
            .payload
            .as_measurement()
            .expect("command payload is always Bool or Float32");
        let header = AsduHeader::decode(bytes)?;
        match self.registry.apply_command(asdu.ioa, asdu.type_id, value) {
            Ok(()) => self.reply_mirrored(stream, link, bytes, header, Cot::ActivationConfirm),
            Err(Error::UnknownIoa { .. }) | Err(Error::TypeMismatch { .. }) => {
                self.reply_mirrored(stream, link, bytes, header, Cot::UnknownIoa)
            }
            Err(e) => Err(e),
        }
    }

    /// Reply with the same ASDU bytes the peer sent, only the COT
    /// byte patched — echoes a command back with an updated cause of
    /// transmission.
    fn reply_mirrored(
        &self,
        stream: &mut TcpStream,
        link: &mut Link,
        bytes: &[u8],
        header: AsduHeader,
        cot: Cot,
    ) -> Result<(), Error> {
        log::debug!("replying ioa={} type={} with cot={:?}", header.ioa, header.type_raw, cot);
        let mut reply = bytes.to_vec();
        reply[COT_OFFSET] = cot.as_raw();
        let frame = Apci::i(link.send_seq(), link.recv_seq(), reply);
        write_frame(stream, &frame)?;
        link.note_sent();
        Ok(())
    }

    fn handle_interrogation(&self, stream: &mut TcpStream, link: &mut Link, casdu: u16) -> Result<(), Error> {
        let snapshot = self.registry.interrogation_snapshot()?;
        for (i, point) in snapshot.iter().enumerate() {
            let asdu = Asdu::new(
                point.value.type_id(),
                Cot::Activation,
                casdu,
                point.ioa,
                point.value.into(),
            );
            let frame = Apci::i(link.send_seq(), link.recv_seq(), asdu.encode());
            write_frame(stream, &frame)?;
            link.note_sent();
            if i + 1 < snapshot.len() {
                thread::sleep(INTERROGATION_INTER_FRAME_DELAY);
            }
        }
        Ok(())
    }
}
