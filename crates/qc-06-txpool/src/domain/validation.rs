//! Stateless transaction validation.
//!
//! [`check_sanity`] needs nothing but the transaction. [`check_inputs`]
//! additionally needs a populated [`UtxoView`] and must only run after the
//! sanity pass, since it relies on output totals being in range.

use super::entities::{Transaction, UtxoView};
use super::errors::{InputError, SanityError};
use std::collections::HashSet;

/// Structural checks, first failure wins.
pub fn check_sanity(tx: &Transaction, max_amount: i64) -> Result<(), SanityError> {
    if tx.inputs().is_empty() {
        return Err(SanityError::NoInputs);
    }
    if tx.outputs().is_empty() {
        return Err(SanityError::NoOutputs);
    }

    let mut total: i64 = 0;
    for (index, output) in tx.outputs().iter().enumerate() {
        if output.value < 0 {
            return Err(SanityError::NegativeOutputValue {
                index,
                value: output.value,
            });
        }
        total = total
            .checked_add(output.value)
            .ok_or(SanityError::AmountOverflow)?;
        if total > max_amount {
            return Err(SanityError::AmountExceedsMax {
                total,
                max: max_amount,
            });
        }
    }

    let mut seen = HashSet::with_capacity(tx.inputs().len());
    for input in tx.inputs() {
        if !seen.insert(input.previous_output) {
            return Err(SanityError::DuplicateInput(input.previous_output));
        }
    }

    if let Some(index) = tx
        .inputs()
        .iter()
        .position(|input| input.previous_output.is_null())
    {
        return Err(SanityError::NullInputReference { index });
    }

    Ok(())
}

/// Checks input availability and value ranges, returning the fee.
pub fn check_inputs(tx: &Transaction, view: &UtxoView, max_amount: i64) -> Result<i64, InputError> {
    let mut total_in: i64 = 0;
    for (index, input) in tx.inputs().iter().enumerate() {
        let outpoint = input.previous_output;
        let entry = view
            .lookup_entry(&outpoint.hash)
            .filter(|entry| !entry.is_output_spent(outpoint.index))
            .ok_or(InputError::MissingOrSpentInput { index, outpoint })?;

        let value = entry.amount_by_index(outpoint.index);
        if value < 0 {
            return Err(InputError::NegativeSourceValue { outpoint, value });
        }
        if value > max_amount {
            return Err(InputError::SourceExceedsMax {
                outpoint,
                value,
                max: max_amount,
            });
        }

        total_in = total_in
            .checked_add(value)
            .ok_or(InputError::AmountOverflow)?;
        if total_in > max_amount {
            return Err(InputError::AmountExceedsMax {
                total: total_in,
                max: max_amount,
            });
        }
    }

    // Sanity already bounded the output total.
    let total_out: i64 = tx.outputs().iter().map(|output| output.value).sum();
    if total_in < total_out {
        return Err(InputError::InsufficientInput {
            input: total_in,
            output: total_out,
        });
    }

    Ok(total_in - total_out)
}
