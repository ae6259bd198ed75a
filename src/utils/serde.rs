//! Base58 string (de)serialization for public keys.
//!
//! `solana_pubkey::Pubkey`'s own serde impl encodes raw bytes; JSON sources
//! (DAS responses, configuration files) carry base58 strings instead.

use std::str::FromStr ;
use serde::{ Deserialize, Deserializer };
use serde::de::Error ;
use solana_pubkey::Pubkey ;



pub fn pubkey_from_str<'de, D>( deserializer: D ) -> Result<Pubkey, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize( deserializer )?;
    Pubkey::from_str( &value )
        .map_err(| err | D::Error::custom( format!( "invalid public key '{}': {}", value, err )))
}

pub fn pubkeys_from_str<'de, D>( deserializer: D ) -> Result<Vec<Pubkey>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize( deserializer )?
        .into_iter()
        .map(| value | Pubkey::from_str( &value )
            .map_err(| err | D::Error::custom( format!( "invalid public key '{}': {}", value, err ))))
        .collect()
}
