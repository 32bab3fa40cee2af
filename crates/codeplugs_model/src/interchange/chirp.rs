//! The generic CHIRP channel CSV.

use std::io::{Read, Write};

use csv::{ReaderBuilder, Writer};
use tracing::debug;

use super::{ImportError, Row};
use crate::channel::{ANALOG_BANDWIDTH, Channel, ChannelType, DIGITAL_BANDWIDTH, Protocol};

pub const HEADER: [&str; 17] = [
    "Location",
    "Name",
    "Frequency",
    "Duplex",
    "Offset",
    "Tone",
    "rToneFreq",
    "cToneFreq",
    "DtcsCode",
    "DtcsPolarity",
    "RxDtcsCode",
    "CrossMode",
    "Mode",
    "TStep",
    "Skip",
    "Power",
    "Comment",
];

const DEFAULT_TONE: &str = "88.5";
const DEFAULT_DTCS: &str = "023";

/// Frequencies are kept to the Hz.
fn round(mhz: f64) -> f64 {
    (mhz * 1e6).round() / 1e6
}

fn power(value: &str) -> String {
    if value.is_empty() {
        return "High".to_string();
    }

    match value.trim_end_matches(['W', 'w']).parse::<f64>() {
        Ok(watts) if watts > 25.0 => "High",
        Ok(watts) if watts > 5.0 => "Mid",
        Ok(_) => "Low",
        Err(_) if matches!(value, "High" | "Mid" | "Low") => value,
        Err(_) => "High",
    }
    .to_string()
}

fn apply_mode(channel: &mut Channel, mode: &str) {
    let (mode, channel_type, protocol, bandwidth) = match mode {
        "" | "Analog" | "FM" => ("FM", ChannelType::Analog, Protocol::Fm, ANALOG_BANDWIDTH),
        "NFM" => ("FM", ChannelType::Analog, Protocol::Fm, DIGITAL_BANDWIDTH),
        "AM" => ("AM", ChannelType::Analog, Protocol::Am, ANALOG_BANDWIDTH),
        "DMR" | "Digital" => ("DMR", ChannelType::DigitalDmr, Protocol::Dmr, DIGITAL_BANDWIDTH),
        "DN" => ("DN", ChannelType::DigitalYsf, Protocol::Fusion, DIGITAL_BANDWIDTH),
        "DV" => ("DV", ChannelType::DigitalDStar, Protocol::DStar, DIGITAL_BANDWIDTH),
        "P25" => ("P25", ChannelType::DigitalP25, Protocol::P25, DIGITAL_BANDWIDTH),
        other => (other, ChannelType::Analog, Protocol::Fm, ANALOG_BANDWIDTH),
    };

    channel.mode = mode.to_string();
    channel.channel_type = channel_type;
    channel.protocol = protocol;
    channel.bandwidth = bandwidth.to_string();
}

fn apply_tone(channel: &mut Channel, row: &Row) {
    let squelch = match row.get("Tone") {
        "Tone" => {
            channel.tx_tone = row.get("rToneFreq").to_string();
            "Tone"
        }
        "TSQL" => {
            channel.tx_tone = row.get("cToneFreq").to_string();
            channel.rx_tone = channel.tx_tone.clone();
            "TSQL"
        }
        "DTCS" => {
            channel.tx_dcs = row.get("DtcsCode").to_string();
            channel.rx_dcs = match row.get("RxDtcsCode") {
                "" => channel.tx_dcs.clone(),
                code => code.to_string(),
            };
            "DCS"
        }
        // Split tones squelch like TSQL with different tones each way.
        "Cross" if row.get("CrossMode") == "Tone->Tone" => {
            channel.tx_tone = row.get("rToneFreq").to_string();
            channel.rx_tone = row.get("cToneFreq").to_string();
            "TSQL"
        }
        "Cross" => "Cross",
        _ => "None",
    };

    channel.squelch_type = squelch.to_string();
}

fn channel(row: &Row) -> Channel {
    let mut channel = Channel {
        name: row.get("Name").to_string(),
        rx_frequency: round(row.get("Frequency").parse().unwrap_or_default()),
        power: power(row.get("Power")),
        notes: row.get("Comment").to_string(),
        ..Default::default()
    };

    let offset = row.get("Offset").parse::<f64>().unwrap_or_default();
    channel.tx_frequency = round(match row.get("Duplex") {
        "+" => channel.rx_frequency + offset,
        "-" => channel.rx_frequency - offset,
        "split" => offset,
        _ => channel.rx_frequency,
    });

    apply_mode(&mut channel, row.get("Mode"));
    apply_tone(&mut channel, row);

    channel
}

/// Reads channels from a CHIRP export. Columns are matched by header name,
/// so exports with extra or reordered columns read fine.
pub fn read(reader: impl Read) -> Result<Vec<Channel>, ImportError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Row::columns(reader.headers()?);

    let mut channels = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = Row {
            columns: &columns,
            record: &record,
        };

        channels.push(channel(&row));
    }

    debug!(count = channels.len(), "Read CHIRP channels");

    Ok(channels)
}

fn mode(channel: &Channel) -> Option<&'static str> {
    match channel.protocol {
        Protocol::Fm if channel.bandwidth == DIGITAL_BANDWIDTH => Some("NFM"),
        Protocol::Fm => Some("FM"),
        Protocol::Am => Some("AM"),
        Protocol::Fusion => Some("DN"),
        Protocol::DStar => Some("DV"),
        Protocol::P25 => Some("P25"),
        Protocol::Dmr | Protocol::Nxdn => None,
    }
}

fn duplex(channel: &Channel) -> (&'static str, f64) {
    let diff = channel.tx_frequency - channel.rx_frequency;

    if diff > 1e-6 {
        ("+", diff)
    } else if diff < -1e-6 {
        ("-", -diff)
    } else {
        ("", 0.0)
    }
}

struct Tone {
    mode: &'static str,
    r_tone: String,
    c_tone: String,
    dtcs: String,
    rx_dtcs: String,
    cross_mode: &'static str,
}

impl Tone {
    fn of(channel: &Channel) -> Self {
        let or = |value: &str, fallback: &str| match value {
            "" => fallback.to_string(),
            value => value.to_string(),
        };

        let mut tone = Self {
            mode: "",
            r_tone: DEFAULT_TONE.to_string(),
            c_tone: DEFAULT_TONE.to_string(),
            dtcs: DEFAULT_DTCS.to_string(),
            rx_dtcs: DEFAULT_DTCS.to_string(),
            cross_mode: "",
        };

        let (tx, rx) = (channel.tx_tone.as_str(), channel.rx_tone.as_str());

        match channel.squelch_type.as_str() {
            "Tone" => {
                tone.mode = "Tone";
                tone.r_tone = or(tx, DEFAULT_TONE);
            }
            "TSQL" | "Cross" if !tx.is_empty() && !rx.is_empty() && tx != rx => {
                tone.mode = "Cross";
                tone.cross_mode = "Tone->Tone";
                tone.r_tone = tx.to_string();
                tone.c_tone = rx.to_string();
            }
            "TSQL" => {
                tone.mode = "TSQL";
                tone.c_tone = or(tx, &or(rx, DEFAULT_TONE));
            }
            "DCS" => {
                tone.mode = "DTCS";
                tone.dtcs = or(&channel.tx_dcs, DEFAULT_DTCS);
                tone.rx_dtcs = or(&channel.rx_dcs, &tone.dtcs);
            }
            "Cross" => tone.mode = "Cross",
            _ => {}
        }

        tone
    }
}

/// Writes the channels CHIRP can program, numbering them from zero, and
/// returns how many were written. DMR and NXDN channels are left out.
pub fn write(channels: &[Channel], writer: impl Write) -> Result<usize, csv::Error> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    let mut location = 0;
    for channel in channels {
        let Some(mode) = mode(channel) else {
            debug!(channel = %channel.name, protocol = %channel.protocol, "Skipping channel");
            continue;
        };

        let (duplex, offset) = duplex(channel);
        let tone = Tone::of(channel);

        writer.write_record([
            location.to_string(),
            channel.name.clone(),
            format!("{:.6}", channel.rx_frequency),
            duplex.to_string(),
            format!("{offset:.6}"),
            tone.mode.to_string(),
            tone.r_tone,
            tone.c_tone,
            tone.dtcs,
            "NN".to_string(),
            tone.rx_dtcs,
            tone.cross_mode.to_string(),
            mode.to_string(),
            "5.00".to_string(),
            String::new(),
            channel.power.clone(),
            channel.notes.clone(),
        ])?;

        location += 1;
    }

    writer.flush()?;

    Ok(location)
}
