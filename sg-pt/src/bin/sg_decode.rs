/// Decode SCSI response data given as hex
///
/// Useful to look at sense buffers or parameter data captured from logs
/// (e.g. `SG_LOG=debug` output) without access to the device.
///
/// Text output by default, `--json <opts>` switches to JSON.
use anyhow::{bail, Error};

use proxmox_router::cli::*;
use proxmox_schema::api;

use sg_json::{JsonOptions, NodeId, SgjState};
use sg_pt::{
    ata::decode_ata_log_directory, designator::render_designator_list,
    element_status::decode_physical_element_status, inquiry::decode_standard_inquiry,
    lba_status::decode_lba_status, log_page::decode_log_page, luns::decode_report_luns,
    sense::decode_sense, tpg::decode_target_port_groups,
};

fn parse_hex(text: &str) -> Result<Vec<u8>, Error> {
    let text: String = text
        .split(|c: char| c.is_ascii_whitespace() || c == ',' || c == ':')
        .map(|byte| {
            let byte = byte.trim_start_matches("0x");
            match byte.len() {
                1 => format!("0{byte}"),
                _ => byte.to_string(),
            }
        })
        .collect();

    if text.is_empty() {
        bail!("no hex data given");
    }
    Ok(hex::decode(text)?)
}

fn output_state(json: Option<&str>) -> Result<SgjState, Error> {
    match json {
        Some(optarg) => Ok(SgjState::new(JsonOptions::from_env_and_arg(Some(optarg))?, true)),
        None => Ok(SgjState::new(JsonOptions::default(), false)),
    }
}

fn run_decoder<F>(hex: &str, json: Option<String>, decode: F) -> Result<(), Error>
where
    F: FnOnce(&mut SgjState, Option<NodeId>, &[u8]) -> Result<(), Error>,
{
    let data = parse_hex(hex)?;
    log::debug!("decoding {} bytes", data.len());

    let mut sgj = output_state(json.as_deref())?;
    let argv: Vec<String> = std::env::args().collect();
    let obj = sgj.start(Some("sg-decode"), None, &argv);

    decode(&mut sgj, obj, &data)?;

    sgj.finish_output(Some(0), &mut std::io::stdout())?;
    Ok(())
}

#[api(
    input: {
        properties: {
            hex: {
                description: "Sense buffer as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode a sense buffer (fixed or descriptor format)
fn sense(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        let sense = decode_sense(data)?;
        sense.render(sgj, obj, 0);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "Designation descriptor list as hex (without VPD page header).",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode a list of designation descriptors
fn designators(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        render_designator_list(sgj, obj, data);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "Standard INQUIRY data as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode standard INQUIRY data
fn inquiry(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_standard_inquiry(data)?.render(sgj, obj);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "GET LBA STATUS parameter data as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode GET LBA STATUS parameter data
fn lba_status(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_lba_status(data)?.render(sgj, obj);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "GET PHYSICAL ELEMENT STATUS parameter data as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode GET PHYSICAL ELEMENT STATUS parameter data
fn element_status(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_physical_element_status(data)?.render(sgj, obj);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "REPORT TARGET PORT GROUPS parameter data as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode REPORT TARGET PORT GROUPS parameter data
fn tpg(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_target_port_groups(data)?.render(sgj, obj);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "REPORT LUNS parameter data as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode REPORT LUNS parameter data
fn luns(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_report_luns(data)?.render(sgj, obj);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "LOG SENSE parameter data as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode a log page
fn log_page(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_log_page(data)?.render(sgj, obj);
        Ok(())
    })
}

#[api(
    input: {
        properties: {
            hex: {
                description: "ATA log directory (512 bytes) as hex.",
                type: String,
            },
            json: {
                description: "Produce JSON output, with the given output options.",
                type: String,
                optional: true,
            },
        },
    },
)]
/// Decode the ATA general purpose log directory
fn ata_log(hex: String, json: Option<String>) -> Result<(), Error> {
    run_decoder(&hex, json, |sgj, obj, data| {
        decode_ata_log_directory(data)?.render(sgj, obj);
        Ok(())
    })
}

fn main() {
    init_cli_logger("SG_LOG", "info");

    let cmd_def = CliCommandMap::new()
        .insert("sense", CliCommand::new(&API_METHOD_SENSE).arg_param(&["hex"]))
        .insert(
            "designators",
            CliCommand::new(&API_METHOD_DESIGNATORS).arg_param(&["hex"]),
        )
        .insert("inquiry", CliCommand::new(&API_METHOD_INQUIRY).arg_param(&["hex"]))
        .insert(
            "lba-status",
            CliCommand::new(&API_METHOD_LBA_STATUS).arg_param(&["hex"]),
        )
        .insert(
            "element-status",
            CliCommand::new(&API_METHOD_ELEMENT_STATUS).arg_param(&["hex"]),
        )
        .insert("tpg", CliCommand::new(&API_METHOD_TPG).arg_param(&["hex"]))
        .insert("luns", CliCommand::new(&API_METHOD_LUNS).arg_param(&["hex"]))
        .insert("log-page", CliCommand::new(&API_METHOD_LOG_PAGE).arg_param(&["hex"]))
        .insert("ata-log", CliCommand::new(&API_METHOD_ATA_LOG).arg_param(&["hex"]));

    let rpcenv = CliEnvironment::new();
    run_cli_command(cmd_def, rpcenv, None);
}
