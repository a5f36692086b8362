use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::{Address, Amount, Command, GroupId, ReceiptHash, Registry, RegistryError};

/// Errors that can occur when reading commands or writing balances
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{command}'")]
    UnrecognizedType { line: usize, command: String },

    #[error("line {line}: {command} missing {field}")]
    MissingField {
        line: usize,
        command: &'static str,
        field: &'static str,
    },

    #[error("line {line}: invalid receipt hash: {source}")]
    InvalidReceipt {
        line: usize,
        source: hex::FromHexError,
    },

    #[error("failed to write balances: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush balances: {0}")]
    Flush(#[from] io::Error),

    #[error("failed to read ledger: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    caller: Option<Address>,
    group: Option<GroupId>,
    member: Option<Address>,
    nickname: Option<String>,
    name: Option<String>,
    amount: Option<u64>,
    participants: Option<String>,
    receipt: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    group: GroupId,
    member: &'a Address,
    nickname: &'a str,
    balance: String,
}

/// Read commands from a csv file
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Command, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

fn parse_row(line: usize, row: InputRow) -> Result<Command, CsvError> {
    let missing = |command: &'static str, field: &'static str| CsvError::MissingField {
        line,
        command,
        field,
    };

    let caller = row.caller;
    let caller = |command: &'static str| caller.ok_or_else(|| missing(command, "caller"));

    match row.r#type.as_str() {
        "create_group" => Ok(Command::CreateGroup {
            caller: caller("create_group")?,
            name: row.name.ok_or_else(|| missing("create_group", "name"))?,
            nickname: row.nickname.ok_or_else(|| missing("create_group", "nickname"))?,
            payment: Amount::from_units(row.amount.unwrap_or_default()),
        }),
        "add_member" => Ok(Command::AddMember {
            caller: caller("add_member")?,
            group: row.group.ok_or_else(|| missing("add_member", "group"))?,
            member: row.member.ok_or_else(|| missing("add_member", "member"))?,
            nickname: row.nickname.ok_or_else(|| missing("add_member", "nickname"))?,
        }),
        "expense" => {
            let receipt = match row.receipt {
                Some(digits) => digits
                    .parse()
                    .map_err(|source| CsvError::InvalidReceipt { line, source })?,
                None => ReceiptHash::ABSENT,
            };
            let participants = row
                .participants
                .ok_or_else(|| missing("expense", "participants"))?
                .split_whitespace()
                .map(Address::from)
                .collect();
            Ok(Command::AddExpense {
                caller: caller("expense")?,
                group: row.group.ok_or_else(|| missing("expense", "group"))?,
                description: row.name.unwrap_or_default(),
                amount: Amount::from_units(row.amount.ok_or_else(|| missing("expense", "amount"))?),
                participants,
                receipt,
            })
        }
        "settle" => Ok(Command::SettleDebt {
            caller: caller("settle")?,
            group: row.group.ok_or_else(|| missing("settle", "group"))?,
            creditor: row.member.ok_or_else(|| missing("settle", "member"))?,
            amount: Amount::from_units(row.amount.ok_or_else(|| missing("settle", "amount"))?),
        }),
        "deactivate" => Ok(Command::DeactivateGroup {
            caller: caller("deactivate")?,
            group: row.group.ok_or_else(|| missing("deactivate", "group"))?,
        }),
        other => Err(CsvError::UnrecognizedType {
            line,
            command: other.to_string(),
        }),
    }
}

/// Write every member's net balance in csv format, by group then join order
pub fn write_balances(writer: impl io::Write, registry: &Registry) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for group in registry.groups()? {
        let id = group.id();
        group.read(|ledger| -> Result<(), CsvError> {
            for (member, balance) in ledger.balances() {
                writer.serialize(OutputRow {
                    group: id,
                    member: &member.address,
                    nickname: &member.nickname,
                    balance: balance.to_string(),
                })?;
            }
            Ok(())
        })??;
    }

    writer.flush()?;
    Ok(())
}
