use std::path::{Path, PathBuf};

///////////////////////////////
/// Name of an output file for the first destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelName {
    /// Everything, when not splitting by cell
    All,
    Bucket(String),
    Group(u32),
}

///////////////////////////////
/// File names of everything a run produces, all derived from one root
#[derive(Debug, Clone)]
pub struct OutputNaming {
    core: String,
    first_root: String,
}

impl OutputNaming {
    pub fn new(core: impl Into<String>, prefix: Option<&str>) -> OutputNaming {
        let core = core.into();
        let first_root = match prefix {
            Some(prefix) => {
                let mut root = format!("{}_{}", core, prefix);
                //A prefix like "mouse_" should not give "x_mouse_.bam"
                if root.ends_with('-') || root.ends_with('_') {
                    root.pop();
                }
                root
            }
            None => format!("{}_sel", core),
        };
        OutputNaming { core, first_root }
    }

    /// Use the output root if given, otherwise the input file minus its extension
    pub fn from_input(path_in: &Path, output_root: Option<&Path>, prefix: Option<&str>) -> OutputNaming {
        let core = match output_root {
            Some(root) => root.to_path_buf(),
            None => path_in.with_extension(""),
        };
        OutputNaming::new(core.to_string_lossy(), prefix)
    }

    pub fn rest(&self) -> PathBuf {
        PathBuf::from(format!("{}_rest.bam", self.core))
    }

    pub fn log(&self) -> PathBuf {
        PathBuf::from(format!("{}_split.log", self.core))
    }

    pub fn chimeras(&self) -> PathBuf {
        PathBuf::from(format!("{}_chimeras.txt", self.core))
    }

    pub fn channel(&self, name: &ChannelName) -> PathBuf {
        match name {
            ChannelName::All => PathBuf::from(format!("{}_all.bam", self.first_root)),
            ChannelName::Bucket(key) => PathBuf::from(format!("{}_{}.bam", self.first_root, key)),
            ChannelName::Group(id) => PathBuf::from(format!("{}_group_{}.bam", self.first_root, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_prefix() {
        let naming = OutputNaming::from_input(Path::new("data/mixed.bam"), None, Some("mouse_"));
        assert_eq!(naming.rest(), PathBuf::from("data/mixed_rest.bam"));
        assert_eq!(naming.log(), PathBuf::from("data/mixed_split.log"));
        assert_eq!(naming.chimeras(), PathBuf::from("data/mixed_chimeras.txt"));
        assert_eq!(
            naming.channel(&ChannelName::Bucket("AACG".to_string())),
            PathBuf::from("data/mixed_mouse_AACG.bam")
        );
        assert_eq!(naming.channel(&ChannelName::Group(4)), PathBuf::from("data/mixed_mouse_group_4.bam"));
    }

    #[test]
    fn names_without_prefix() {
        let naming = OutputNaming::from_input(Path::new("mixed.bam"), Some(Path::new("out/run1")), None);
        assert_eq!(naming.rest(), PathBuf::from("out/run1_rest.bam"));
        assert_eq!(naming.channel(&ChannelName::All), PathBuf::from("out/run1_sel_all.bam"));
    }
}
