use rust_htslib::bam::record::Aux;
use rust_htslib::bam::record::Record as BamRecord;

pub const DEFAULT_CELL_TAG: &str = "XC";

///////////////////////////////
/// Where to find the cell of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketKeySource {
    /// String-valued aux tag, such as XC or CB
    Tag([u8; 2]),
    /// Start of the read name, up to the first of any of these characters
    ReadName { stop_chars: Vec<u8> },
}

impl BucketKeySource {
    pub fn tag(tag: &str) -> anyhow::Result<BucketKeySource> {
        let bytes = tag.as_bytes();
        if bytes.len() != 2 {
            anyhow::bail!("Tag must be two characters, got {:?}", tag);
        }
        Ok(BucketKeySource::Tag([bytes[0], bytes[1]]))
    }

    pub fn read_name(stop_chars: &str) -> BucketKeySource {
        BucketKeySource::ReadName {
            stop_chars: stop_chars.as_bytes().to_vec(),
        }
    }

    /// Get the cell of a read. Reads without a usable cell give None
    pub fn extract(&self, record: &BamRecord) -> Option<String> {
        let key = match self {
            BucketKeySource::Tag(tag) => match record.aux(tag) {
                Ok(Aux::String(value)) => value.to_string(),
                _ => return None,
            },
            BucketKeySource::ReadName { stop_chars } => {
                let name = record.qname();
                let end = name
                    .iter()
                    .position(|c| stop_chars.contains(c))
                    .unwrap_or(name.len());
                String::from_utf8_lossy(&name[..end]).into_owned()
            }
        };

        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}
