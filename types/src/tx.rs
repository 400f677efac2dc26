use serde::{Deserialize, Serialize};

use crypto::hash_hex;

use crate::{STRING_FIELD_SIZE, U32_FIELD_SIZE};

/// Reference to an unspent output being consumed. `amount` is a cached copy
/// of the referenced output's amount; the output itself is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prev_tx_hash: String,
    pub output_index: u32,
    pub unlocking_script: String,
    pub amount: u32,
}

impl TransactionInput {
    pub fn new(
        prev_tx_hash: impl Into<String>,
        output_index: u32,
        unlocking_script: impl Into<String>,
        amount: u32,
    ) -> Self {
        Self {
            prev_tx_hash: prev_tx_hash.into(),
            output_index,
            unlocking_script: unlocking_script.into(),
            amount,
        }
    }

    pub fn hash(&self) -> String {
        hash_hex(
            format!(
                "{}/{}/{}/{}",
                self.prev_tx_hash, self.output_index, self.unlocking_script, self.amount
            )
            .as_bytes(),
        )
    }

    /// Locator of the output this input spends.
    pub fn utxo_key(&self) -> String {
        utxo_key(&self.prev_tx_hash, self.output_index)
    }

    pub fn size(&self) -> u32 {
        2 * STRING_FIELD_SIZE + 2 * U32_FIELD_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub amount: u32,
    /// Hex of the recipient's PKIX-encoded public key.
    pub locking_script: String,
    /// Transient reservation mark used during wallet UTXO selection; never
    /// serialized.
    #[serde(skip)]
    pub liminal: bool,
}

impl TransactionOutput {
    pub fn new(amount: u32, locking_script: impl Into<String>) -> Self {
        Self {
            amount,
            locking_script: locking_script.into(),
            liminal: false,
        }
    }

    pub fn hash(&self) -> String {
        hash_hex(format!("{}/{}", self.amount, self.locking_script).as_bytes())
    }

    pub fn size(&self) -> u32 {
        STRING_FIELD_SIZE + U32_FIELD_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub lock_time: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new(
        version: u32,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u32,
    ) -> Self {
        Self {
            version,
            lock_time,
            inputs,
            outputs,
        }
    }

    /// Canonical transaction hash: version, lock-time, then every input and
    /// output hash, in order.
    pub fn hash(&self) -> String {
        let mut fields = Vec::with_capacity(self.inputs.len() + self.outputs.len() + 2);
        fields.push(self.version.to_string());
        fields.push(self.lock_time.to_string());
        fields.extend(self.inputs.iter().map(|input| input.hash()));
        fields.extend(self.outputs.iter().map(|output| output.hash()));
        hash_hex(fields.join("/").as_bytes())
    }

    /// A coinbase mints currency and therefore consumes nothing.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn sum_inputs(&self) -> u32 {
        self.inputs.iter().map(|input| input.amount).sum()
    }

    pub fn sum_outputs(&self) -> u32 {
        self.outputs.iter().map(|output| output.amount).sum()
    }

    pub fn size(&self) -> u32 {
        let inputs: u32 = self.inputs.iter().map(TransactionInput::size).sum();
        let outputs: u32 = self.outputs.iter().map(TransactionOutput::size).sum();
        inputs + outputs + 2 * U32_FIELD_SIZE
    }
}

/// Locator of a single output: `"{tx_hash}-{index}"`.
pub fn utxo_key(tx_hash: &str, index: u32) -> String {
    format!("{}-{}", tx_hash, index)
}

/// Split a locator back into its transaction hash and output index.
pub fn parse_utxo_key(key: &str) -> Option<(String, u32)> {
    let (hash, index) = key.rsplit_once('-')?;
    Some((hash.to_string(), index.parse().ok()?))
}
