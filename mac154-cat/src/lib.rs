use colored::*;
use mac154_frame::*;

struct Writer<'b> {
    buffer: &'b mut String,
    indent: usize,
}

impl<'b> Writer<'b> {
    fn new(buffer: &'b mut String) -> Self {
        Self { buffer, indent: 0 }
    }

    fn increase_indent(&mut self) {
        self.indent += 2;
    }

    fn decrease_indent(&mut self) {
        self.indent -= 2;
    }

    fn write(&mut self, s: String) {
        self.buffer.push_str(&" ".repeat(self.indent));
        self.buffer.push_str(&s);
    }

    fn writeln(&mut self, s: String) {
        self.write(s);
        self.buffer.push('\n');
    }
}

pub struct FrameParser {}

impl FrameParser {
    pub fn parse_hex(input: &str) -> Result<String> {
        let data = hex::decode(input).map_err(|_| Error::Malformed)?;
        Self::parse(&data)
    }

    pub fn parse(input: &[u8]) -> Result<String> {
        let frame = Frame::new(input)?;
        let repr = FrameRepr::parse(&frame)?;

        let mut buffer = String::new();
        let mut w = Writer::new(&mut buffer);

        let fc = &repr.frame_control;

        // -----------------------------------------------------------------
        // Frame Control
        // -----------------------------------------------------------------
        w.writeln("Frame Control".underline().bold().to_string());
        w.increase_indent();
        w.writeln(format!(
            "{}: {}",
            "frame type".bold(),
            format!("{:?}", fc.frame_type).bright_blue()
        ));
        w.writeln(format!(
            "{}: {}",
            "security".bold(),
            fc.security_enabled as usize
        ));
        w.writeln(format!(
            "{}: {}",
            "frame pending".bold(),
            fc.frame_pending as usize
        ));
        w.writeln(format!(
            "{}: {}",
            "ack request".bold(),
            fc.ack_request as usize
        ));
        w.writeln(format!(
            "{}: {}",
            "pan id compression".bold(),
            fc.pan_id_compression as usize
        ));
        w.writeln(format!(
            "{}: {:?}",
            "dst addressing mode".bold(),
            fc.dst_addressing_mode
        ));
        w.writeln(format!(
            "{}: {:?}",
            "src addressing mode".bold(),
            fc.src_addressing_mode
        ));
        w.writeln(format!(
            "{}: {:?}",
            "frame version".bold(),
            fc.frame_version
        ));
        w.decrease_indent();

        // -----------------------------------------------------------------
        // Sequence Number
        // -----------------------------------------------------------------
        w.writeln(format!("{}", "Sequence Number".underline().bold()));
        w.increase_indent();
        w.writeln(format!(
            "{}: {}",
            "sequence number".bold(),
            repr.sequence_number
        ));
        w.decrease_indent();

        // -----------------------------------------------------------------
        // Addressing
        // -----------------------------------------------------------------
        let addr = &repr.addressing;
        if addr.dst_pan_id.is_some() || addr.src_pan_id.is_some() {
            w.writeln(format!("{}", "Addressing".underline().bold()));
            w.increase_indent();

            if let Some(dst_pan_id) = addr.dst_pan_id {
                w.writeln(format!("{}: {:x}", "dst pan id".bold(), dst_pan_id));
            }

            if let Some(dst_addr) = addr.dst_address {
                w.writeln(format!(
                    "{}: {}{}",
                    "dst addr".bold(),
                    dst_addr,
                    if dst_addr.is_broadcast() {
                        " (broadcast)"
                    } else {
                        ""
                    }
                ));
            }

            if let Some(src_pan_id) = addr.src_pan_id {
                w.writeln(format!("{}: {:x}", "src pan id".bold(), src_pan_id));
            }

            if let Some(src_addr) = addr.src_address {
                w.writeln(format!("{}: {}", "src addr".bold(), src_addr));
            }
            w.decrease_indent();
        }

        // -----------------------------------------------------------------
        // Payload
        // -----------------------------------------------------------------
        match &repr.payload {
            FramePayloadRepr::Beacon(beacon) => Self::write_beacon(&mut w, beacon),
            FramePayloadRepr::Command(command) => {
                w.writeln(format!("{}", "MAC Command".underline().bold()));
                w.increase_indent();
                w.writeln(format!("{}: {:?}", "command".bold(), command.command_id()));
                match command {
                    MacCommand::AssociationRequest(capability) => {
                        w.writeln(format!("{}: {:?}", "capability".bold(), capability));
                    }
                    MacCommand::AssociationResponse {
                        short_address,
                        status,
                    } => {
                        w.writeln(format!("{}: {:04x}", "short address".bold(), short_address));
                        w.writeln(format!("{}: {:?}", "status".bold(), status));
                    }
                    MacCommand::DisassociationNotification(reason) => {
                        w.writeln(format!("{}: {:?}", "reason".bold(), reason));
                    }
                    MacCommand::CoordinatorRealignment(realignment) => {
                        w.writeln(format!("{}: {:x}", "pan id".bold(), realignment.pan_id));
                        w.writeln(format!(
                            "{}: {:04x}",
                            "coord short addr".bold(),
                            realignment.coord_short_address
                        ));
                        w.writeln(format!("{}: {}", "channel".bold(), realignment.channel));
                        w.writeln(format!(
                            "{}: {:04x}",
                            "device short addr".bold(),
                            realignment.device_short_address
                        ));
                    }
                    MacCommand::GtsRequest(characteristics) => {
                        w.writeln(format!(
                            "{}: {} slots, {:?}, {:?}",
                            "characteristics".bold(),
                            characteristics.length,
                            characteristics.direction,
                            characteristics.characteristics_type
                        ));
                    }
                    _ => {}
                }
                w.decrease_indent();
            }
            FramePayloadRepr::Data(payload) => {
                w.writeln(format!("{}", "Payload".underline().bold()));
                w.increase_indent();
                w.writeln(format!("{:x?}", &payload[..]));
                w.decrease_indent();
            }
            FramePayloadRepr::Ack => {}
        }

        Ok(buffer)
    }

    fn write_beacon(w: &mut Writer, beacon: &BeaconRepr) {
        w.writeln(format!("{}", "Superframe Specification".underline().bold()));
        w.increase_indent();
        let spec = &beacon.superframe_spec;
        w.writeln(format!("{}: {:?}", "beacon order".bold(), spec.beacon_order));
        w.writeln(format!(
            "{}: {:?}",
            "superframe order".bold(),
            spec.superframe_order
        ));
        w.writeln(format!(
            "{}: {}",
            "final cap slot".bold(),
            spec.final_cap_slot
        ));
        w.writeln(format!(
            "{}: {}",
            "pan coordinator".bold(),
            spec.pan_coordinator as usize
        ));
        w.writeln(format!(
            "{}: {}",
            "association permit".bold(),
            spec.association_permit as usize
        ));
        w.decrease_indent();

        w.writeln(format!("{}", "GTS".underline().bold()));
        w.increase_indent();
        w.writeln(format!("{}: {}", "permit".bold(), beacon.gts.permit as usize));
        for descriptor in &beacon.gts.descriptors {
            w.writeln(format!(
                "{}: {:04x}, slot {}, length {}, {:?}",
                "slot".bold(),
                descriptor.short_address,
                descriptor.starting_slot,
                descriptor.length,
                descriptor.direction
            ));
        }
        w.decrease_indent();

        w.writeln(format!("{}", "Pending Addresses".underline().bold()));
        w.increase_indent();
        for short in &beacon.pending_addresses.short_addresses {
            w.writeln(format!("{}: {:04x}", "short".bold(), short));
        }
        for extended in &beacon.pending_addresses.extended_addresses {
            w.writeln(format!(
                "{}: {}",
                "extended".bold(),
                Address::Extended(*extended)
            ));
        }
        w.decrease_indent();

        if !beacon.payload.is_empty() {
            w.writeln(format!("{}", "Beacon Payload".underline().bold()));
            w.increase_indent();
            w.writeln(format!("{:x?}", &beacon.payload[..]));
            w.decrease_indent();
        }
    }
}
