//! Bounds-checked IEEE 802.11 header parsing.
//!
//! The header is variable length: three addresses normally, four when
//! both DS bits are set in frame control, plus a trailing QoS-control
//! word on QoS-data frames.  The two tests are independent — a frame
//! can be 4-address with or without QoS, and vice versa.
//!
//! Parsing is pure and never fails: any field that cannot be read
//! within the buffer's bounds stays at its zero default, and the
//! event is still usable with whatever was parsed.

use meshtrace_protocol::{
    EventRecord, MacAddr, CHECK_QOS, ETH_ALEN, HAS_ADDR4, HAS_QOS, HDR_SIZE_3ADDR, HDR_SIZE_4ADDR,
};

// Field offsets within the fixed header.
const OFF_FRAME_CONTROL: usize = 0;
const OFF_ADDR1: usize = 4;
const OFF_ADDR2: usize = 10;
const OFF_ADDR3: usize = 16;
const OFF_SEQ_CONTROL: usize = 22;
const OFF_ADDR4: usize = 24;

/// Header fields parsed out of a raw frame buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    pub frame_control: u16,
    pub seq_control: u16,
    pub qos_control: u16,
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub addr4: MacAddr,
}

impl ParsedHeader {
    /// Copy the parsed fields into a finished-event record.
    pub fn write_into(&self, rec: &mut EventRecord) {
        rec.frame_control = self.frame_control;
        rec.seq_control = self.seq_control;
        rec.qos_control = self.qos_control;
        rec.addr1 = self.addr1;
        rec.addr2 = self.addr2;
        rec.addr3 = self.addr3;
        rec.addr4 = self.addr4;
    }
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    match buf.get(off..off + 2) {
        Some(b) => u16::from_le_bytes([b[0], b[1]]),
        None => 0,
    }
}

fn read_addr(buf: &[u8], off: usize) -> MacAddr {
    match buf.get(off..off + ETH_ALEN) {
        Some(b) => {
            let mut addr = [0u8; ETH_ALEN];
            addr.copy_from_slice(b);
            MacAddr(addr)
        }
        None => MacAddr::ZERO,
    }
}

/// Parse the link-layer header at the start of `buf`.
pub fn parse(buf: &[u8]) -> ParsedHeader {
    let mut hdr = ParsedHeader {
        frame_control: read_u16(buf, OFF_FRAME_CONTROL),
        seq_control: read_u16(buf, OFF_SEQ_CONTROL),
        addr1: read_addr(buf, OFF_ADDR1),
        addr2: read_addr(buf, OFF_ADDR2),
        addr3: read_addr(buf, OFF_ADDR3),
        ..ParsedHeader::default()
    };

    let hdr_size = if hdr.frame_control & HAS_ADDR4 == HAS_ADDR4 {
        hdr.addr4 = read_addr(buf, OFF_ADDR4);
        HDR_SIZE_4ADDR
    } else {
        HDR_SIZE_3ADDR
    };

    if hdr.frame_control & CHECK_QOS == HAS_QOS {
        hdr.qos_control = read_u16(buf, hdr_size);
    }

    hdr
}
