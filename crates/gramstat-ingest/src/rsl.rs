//! RSL attribute bitfield codec.
//!
//! A job's requested RSL attributes are reported as a base bitfield of
//! standard attributes plus a comma-separated list of extension attribute
//! names. Each extension name is registered in `gram5_rsl_attributes` and
//! its id is used as a bit position, so the combined bitfield widens as
//! new extensions appear. Extension ids start above the standard bits, so
//! an extension never aliases a base bit. It is kept as a [`BigUint`] for that reason.

use num_bigint::BigUint;
use rusqlite::Connection;

use gramstat_store::{
    BitfieldRegistry, DimensionCache, RslAttributes, StoreError, StoreResult, tables,
};

/// Parse the packet's base bitfield (decimal text).
pub fn parse_base(text: &str) -> Option<BigUint> {
    text.trim().parse::<BigUint>().ok()
}

fn bit_position(attribute: &str, id: i64) -> StoreResult<u64> {
    u64::try_from(id).map_err(|_| StoreError::InvalidValue {
        table: tables::RSL_ATTRIBUTES,
        column: "id",
        value: format!("{id} ({attribute})"),
    })
}

/// OR the bit of every extension attribute into `base`, registering
/// unseen attribute names along the way.
pub fn encode(
    session: &Connection,
    attributes: &mut DimensionCache<RslAttributes>,
    base: BigUint,
    extensions: Option<&str>,
) -> StoreResult<BigUint> {
    let mut bitfield = base;
    let names = extensions
        .into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty());
    for name in names {
        let id = attributes.get_or_create(session, &name.to_string())?;
        bitfield.set_bit(bit_position(name, id)?, true);
    }
    Ok(bitfield)
}

/// Sorted names of every known attribute whose bit is set.
pub fn decode(bitfield: &BigUint, attributes: &DimensionCache<RslAttributes>) -> Vec<String> {
    let mut names: Vec<String> = attributes
        .iter()
        .filter(|(_, id)| u64::try_from(*id).is_ok_and(|bit| bitfield.bit(bit)))
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}

/// Encode, then record the bitfield's attribute list the first time this
/// exact bitfield is seen. Returns the bitfield used as the job's key.
pub fn canonicalize(
    session: &Connection,
    attributes: &mut DimensionCache<RslAttributes>,
    groups: &mut BitfieldRegistry,
    base: BigUint,
    extensions: Option<&str>,
) -> StoreResult<BigUint> {
    let bitfield = encode(session, attributes, base, extensions)?;
    if !groups.contains(&bitfield) {
        let names = decode(&bitfield, attributes);
        groups.register(session, &bitfield, &names)?;
    }
    Ok(bitfield)
}
