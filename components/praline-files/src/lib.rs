extern crate serde;

#[macro_use]
extern crate serde_derive;

pub extern crate url;

mod deployment_manifest;

pub use deployment_manifest::{
    get_mnemonic_file_location, CompilerConfig, CompilerSettings, DeploymentManifest,
    DeploymentManifestFile, NetworkConfig, OptimizerSettings, DEFAULT_COMPILER_NAME,
    DEFAULT_DERIVATION_PATH, DEFAULT_GAS_PRICE, DEFAULT_NETWORK_ID, DEFAULT_NETWORK_NAME,
    DEFAULT_OPTIMIZER_ENABLED, DEFAULT_OPTIMIZER_RUNS, DEFAULT_RPC_URL, DEFAULT_SKIP_DRY_RUN,
    DEFAULT_SOLC_VERSION, DEFAULT_TIMEOUT_BLOCKS, MANIFEST_FILE_NAME, MNEMONIC_FILE_NAME,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::{borrow::BorrowMut, path::PathBuf, str::FromStr};
use url::Url;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum FileLocation {
    FileSystem { path: PathBuf },
    Url { url: Url },
}

impl FileLocation {
    pub fn try_parse(
        location_string: &str,
        project_root_location_hint: Option<&FileLocation>,
    ) -> Option<FileLocation> {
        if let Ok(location) = FileLocation::from_url_string(location_string) {
            return Some(location);
        }
        if let Ok(FileLocation::FileSystem { path }) =
            FileLocation::from_path_string(location_string)
        {
            match (project_root_location_hint, path.is_relative()) {
                (None, true) => return None,
                (Some(hint), true) => {
                    let mut location = hint.clone();
                    location.append_path(location_string).ok()?;
                    return Some(location);
                }
                (_, false) => return Some(FileLocation::FileSystem { path }),
            }
        }
        None
    }

    pub fn from_path(path: PathBuf) -> FileLocation {
        FileLocation::FileSystem { path }
    }

    pub fn from_url(url: Url) -> FileLocation {
        FileLocation::Url { url }
    }

    pub fn from_url_string(url_string: &str) -> Result<FileLocation, String> {
        let url = Url::from_str(url_string)
            .map_err(|e| format!("unable to parse {} as a url\n{:?}", url_string, e))?;

        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| format!("unable to convert url {} to path", url))?;
            return Ok(FileLocation::FileSystem { path });
        }

        Ok(FileLocation::Url { url })
    }

    pub fn from_path_string(path_string: &str) -> Result<FileLocation, String> {
        let path = PathBuf::from_str(path_string)
            .map_err(|e| format!("unable to parse {} as a path\n{:?}", path_string, e))?;
        Ok(FileLocation::FileSystem { path })
    }

    pub fn append_path(&mut self, path_string: &str) -> Result<(), String> {
        let path_to_append = PathBuf::from_str(path_string)
            .map_err(|e| format!("unable to read relative path {}\n{:?}", path_string, e))?;
        match self.borrow_mut() {
            FileLocation::FileSystem { path } => {
                path.extend(&path_to_append);
            }
            FileLocation::Url { url } => {
                let mut paths_segments = url
                    .path_segments_mut()
                    .map_err(|_| "unable to mutate url".to_string())?;
                for component in path_to_append.components() {
                    let segment = component
                        .as_os_str()
                        .to_str()
                        .ok_or(format!("unable to format component {:?}", component))?;
                    paths_segments.push(segment);
                }
            }
        }
        Ok(())
    }

    pub fn read_content_as_utf8(&self) -> Result<String, String> {
        let content = self.read_content()?;
        let content_as_utf8 = String::from_utf8(content).map_err(|e| {
            format!(
                "unable to read content as utf8 {}\n{:?}",
                self.to_string(),
                e
            )
        })?;
        Ok(content_as_utf8)
    }

    pub fn read_content(&self) -> Result<Vec<u8>, String> {
        let bytes = match &self {
            FileLocation::FileSystem { path } => FileLocation::fs_read_content(path),
            FileLocation::Url { url } => match url.scheme() {
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|e| format!("unable to convert url {} to path\n{:?}", url, e))?;
                    FileLocation::fs_read_content(&path)
                }
                _ => {
                    unimplemented!()
                }
            },
        }?;
        Ok(bytes)
    }

    fn fs_read_content(path: &PathBuf) -> Result<Vec<u8>, String> {
        use std::fs::File;
        use std::io::{BufReader, Read};
        let file = File::open(path.clone())
            .map_err(|e| format!("unable to read file {}\n{:?}", path.display(), e))?;
        let mut file_reader = BufReader::new(file);
        let mut file_buffer = vec![];
        file_reader
            .read_to_end(&mut file_buffer)
            .map_err(|e| format!("unable to read file {}\n{:?}", path.display(), e))?;
        Ok(file_buffer)
    }

    pub fn exists(&self) -> bool {
        match self {
            FileLocation::FileSystem { path } => path.exists(),
            FileLocation::Url { url: _url } => unimplemented!(),
        }
    }

    pub fn get_parent_location(&self) -> Result<FileLocation, String> {
        let mut parent_location = self.clone();
        match &mut parent_location {
            FileLocation::FileSystem { path } => {
                let mut parent = path.clone();
                parent.pop();
                if parent.to_str() == path.to_str() {
                    return Err(String::from("reached root"));
                }
                path.pop();
            }
            FileLocation::Url { url } => {
                let mut segments = url
                    .path_segments_mut()
                    .map_err(|_| "unable to mutate url".to_string())?;
                segments.pop();
            }
        }
        Ok(parent_location)
    }

    pub fn get_project_root_location(&self) -> Result<FileLocation, String> {
        let mut project_root_location = self.clone();
        match project_root_location.borrow_mut() {
            FileLocation::FileSystem { path } => {
                let mut manifest_found = false;
                while path.pop() {
                    path.push(MANIFEST_FILE_NAME);
                    if path.exists() {
                        path.pop();
                        manifest_found = true;
                        break;
                    }
                    path.pop();
                }

                match manifest_found {
                    true => Ok(project_root_location),
                    false => Err(format!(
                        "unable to find root location from {}",
                        self.to_string()
                    )),
                }
            }
            _ => {
                unimplemented!();
            }
        }
    }

    pub fn get_manifest_location(&self) -> Result<FileLocation, String> {
        let mut manifest_location = self.get_project_root_location()?;
        manifest_location.append_path(MANIFEST_FILE_NAME)?;
        Ok(manifest_location)
    }

    pub fn get_relative_location(&self) -> Result<String, String> {
        let base = self.get_project_root_location().map(|l| l.to_string())?;
        let file = self.to_string();
        Ok(file[(base.len() + 1)..].to_string())
    }

    pub fn get_file_name(&self) -> Option<String> {
        match self {
            FileLocation::FileSystem { path } => {
                path.file_name().and_then(|f| Some(f.to_str()?.to_string()))
            }
            FileLocation::Url { url } => url
                .path_segments()
                .and_then(|p| Some(p.last()?.to_string())),
        }
    }

    pub fn to_string(&self) -> String {
        match self {
            FileLocation::FileSystem { path } => {
                format!("{}", path.display())
            }
            FileLocation::Url { url } => url.to_string(),
        }
    }
}

impl Serialize for FileLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            FileLocation::FileSystem { path: _ } => {
                let path = match self.get_relative_location() {
                    Ok(relative_path) => relative_path, // Use relative path if possible
                    Err(_) => self.to_string(),         // Fallback on fully qualified path
                };
                map.serialize_entry("path", &path)?;
            }
            FileLocation::Url { url } => {
                map.serialize_entry("url", &url.to_string())?;
            }
        }
        map.end()
    }
}
