use std::collections::BTreeMap;

use evm_rpc_client::wallet::Wallet;
use evm_rpc_client::EvmWalletProvider;
use toml::value::Value;

use super::FileLocation;

pub const MANIFEST_FILE_NAME: &str = "Praline.toml";
pub const MNEMONIC_FILE_NAME: &str = ".mnemonic";

pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

pub const DEFAULT_NETWORK_NAME: &str = "okexchain";
pub const DEFAULT_RPC_URL: &str = "https://exchainrpc.okex.org";
pub const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;
pub const DEFAULT_NETWORK_ID: u32 = 66;
pub const DEFAULT_TIMEOUT_BLOCKS: u32 = 200;
pub const DEFAULT_SKIP_DRY_RUN: bool = true;

pub const DEFAULT_COMPILER_NAME: &str = "solc";
pub const DEFAULT_SOLC_VERSION: &str = "0.8.4";
pub const DEFAULT_OPTIMIZER_ENABLED: bool = true;
pub const DEFAULT_OPTIMIZER_RUNS: u32 = 200;

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct DeploymentManifestFile {
    networks: Option<Value>,
    compilers: Option<Value>,
}

#[derive(Serialize, Debug, Clone)]
pub struct DeploymentManifest {
    pub networks: BTreeMap<String, NetworkConfig>,
    pub compilers: BTreeMap<String, CompilerConfig>,
    #[serde(skip_serializing)]
    pub location: FileLocation,
}

#[derive(Serialize, Debug, Clone)]
pub struct NetworkConfig {
    #[serde(skip_serializing)]
    pub name: String,
    pub rpc_url: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: u64,
    pub network_id: u32,
    #[serde(rename = "timeoutBlocks")]
    pub timeout_blocks: u32,
    #[serde(rename = "skipDryRun")]
    pub skip_dry_run: bool,
    pub derivation_path: String,
    #[serde(skip_serializing)]
    pub mnemonic_file: FileLocation,
}

#[derive(Serialize, Debug, Clone)]
pub struct CompilerConfig {
    #[serde(skip_serializing)]
    pub name: String,
    pub version: String,
    pub settings: CompilerSettings,
}

#[derive(Serialize, Debug, Clone)]
pub struct CompilerSettings {
    pub optimizer: OptimizerSettings,
}

#[derive(Serialize, Debug, Clone)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

pub fn get_mnemonic_file_location(
    manifest_location: &FileLocation,
) -> Result<FileLocation, String> {
    let mut mnemonic_location = manifest_location.get_parent_location()?;
    mnemonic_location.append_path(MNEMONIC_FILE_NAME)?;
    Ok(mnemonic_location)
}

impl DeploymentManifest {
    pub fn from_location(location: &FileLocation) -> Result<DeploymentManifest, String> {
        let manifest_file_content = location.read_content()?;
        let manifest_file: DeploymentManifestFile = toml::from_slice(&manifest_file_content[..])
            .map_err(|e| format!("unable to parse {}: {}", location.to_string(), e))?;
        DeploymentManifest::from_manifest_file(&manifest_file, location)
    }

    // The built-in configuration: one okexchain network, one solc compiler.
    pub fn default_manifest(location: &FileLocation) -> Result<DeploymentManifest, String> {
        DeploymentManifest::from_manifest_file(&DeploymentManifestFile::default(), location)
    }

    pub fn from_manifest_file(
        manifest_file: &DeploymentManifestFile,
        location: &FileLocation,
    ) -> Result<DeploymentManifest, String> {
        let default_mnemonic_file = get_mnemonic_file_location(location)?;

        let mut networks = BTreeMap::new();
        if let Some(Value::Table(entries)) = &manifest_file.networks {
            for (network_name, network_settings) in entries.iter() {
                if let Value::Table(network_settings) = network_settings {
                    let rpc_url = match network_settings.get("rpc_url") {
                        Some(Value::String(rpc_url)) => rpc_url.to_string(),
                        _ => DEFAULT_RPC_URL.to_string(),
                    };

                    let gas_price = match network_settings.get("gas_price") {
                        Some(Value::Integer(gas_price)) => *gas_price as u64,
                        _ => DEFAULT_GAS_PRICE,
                    };

                    let network_id = match network_settings.get("network_id") {
                        Some(Value::Integer(network_id)) => *network_id as u32,
                        _ => DEFAULT_NETWORK_ID,
                    };

                    let timeout_blocks = match network_settings.get("timeout_blocks") {
                        Some(Value::Integer(timeout_blocks)) => *timeout_blocks as u32,
                        _ => DEFAULT_TIMEOUT_BLOCKS,
                    };

                    let skip_dry_run = match network_settings.get("skip_dry_run") {
                        Some(Value::Boolean(skip_dry_run)) => *skip_dry_run,
                        _ => DEFAULT_SKIP_DRY_RUN,
                    };

                    let derivation_path = match network_settings.get("derivation_path") {
                        Some(Value::String(derivation_path)) => derivation_path.to_string(),
                        _ => DEFAULT_DERIVATION_PATH.to_string(),
                    };

                    // Relative secret paths resolve against the manifest's
                    // directory, like every other manifest-relative file.
                    let mnemonic_file = match network_settings.get("mnemonic_path") {
                        Some(Value::String(mnemonic_path)) => {
                            let mut mnemonic_file = location.get_parent_location()?;
                            mnemonic_file.append_path(mnemonic_path)?;
                            mnemonic_file
                        }
                        _ => default_mnemonic_file.clone(),
                    };

                    networks.insert(
                        network_name.to_string(),
                        NetworkConfig {
                            name: network_name.to_string(),
                            rpc_url,
                            gas_price,
                            network_id,
                            timeout_blocks,
                            skip_dry_run,
                            derivation_path,
                            mnemonic_file,
                        },
                    );
                }
            }
        }
        networks
            .entry(DEFAULT_NETWORK_NAME.to_string())
            .or_insert_with(|| NetworkConfig::default_network(default_mnemonic_file.clone()));

        let mut compilers = BTreeMap::new();
        if let Some(Value::Table(entries)) = &manifest_file.compilers {
            for (compiler_name, compiler_settings) in entries.iter() {
                if let Value::Table(compiler_settings) = compiler_settings {
                    let version = match compiler_settings.get("version") {
                        Some(Value::String(version)) => version.to_string(),
                        _ => DEFAULT_SOLC_VERSION.to_string(),
                    };

                    let optimizer = compiler_settings
                        .get("settings")
                        .and_then(|settings| settings.get("optimizer"));
                    let (enabled, runs) = match optimizer {
                        Some(Value::Table(optimizer)) => (
                            match optimizer.get("enabled") {
                                Some(Value::Boolean(enabled)) => *enabled,
                                _ => DEFAULT_OPTIMIZER_ENABLED,
                            },
                            match optimizer.get("runs") {
                                Some(Value::Integer(runs)) => *runs as u32,
                                _ => DEFAULT_OPTIMIZER_RUNS,
                            },
                        ),
                        _ => (DEFAULT_OPTIMIZER_ENABLED, DEFAULT_OPTIMIZER_RUNS),
                    };

                    compilers.insert(
                        compiler_name.to_string(),
                        CompilerConfig {
                            name: compiler_name.to_string(),
                            version,
                            settings: CompilerSettings {
                                optimizer: OptimizerSettings { enabled, runs },
                            },
                        },
                    );
                }
            }
        }
        compilers
            .entry(DEFAULT_COMPILER_NAME.to_string())
            .or_insert_with(CompilerConfig::default_compiler);

        Ok(DeploymentManifest {
            networks,
            compilers,
            location: location.clone(),
        })
    }
}

impl NetworkConfig {
    pub fn default_network(mnemonic_file: FileLocation) -> NetworkConfig {
        NetworkConfig {
            name: DEFAULT_NETWORK_NAME.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            gas_price: DEFAULT_GAS_PRICE,
            network_id: DEFAULT_NETWORK_ID,
            timeout_blocks: DEFAULT_TIMEOUT_BLOCKS,
            skip_dry_run: DEFAULT_SKIP_DRY_RUN,
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
            mnemonic_file,
        }
    }

    // The secret file is read on demand, never at manifest load.
    pub fn get_mnemonic(&self) -> Result<String, String> {
        let phrase = self.mnemonic_file.read_content_as_utf8()?;
        Ok(phrase.trim().to_string())
    }

    pub fn deployer_address(&self) -> Result<String, String> {
        let mnemonic = self.get_mnemonic()?;
        let (_, public_key) =
            praline_utils::get_bip32_keys_from_mnemonic(&mnemonic, "", &self.derivation_path)?;
        Ok(evm_rpc_client::wallet::compute_eth_address(&public_key))
    }

    pub fn wallet_provider(&self) -> Result<EvmWalletProvider, String> {
        let mnemonic = self.get_mnemonic()?;
        let wallet = Wallet {
            mnemonic,
            derivation: self.derivation_path.clone(),
            chain_id: self.network_id as u64,
        };
        Ok(EvmWalletProvider::new(wallet, &self.rpc_url))
    }
}

impl CompilerConfig {
    pub fn default_compiler() -> CompilerConfig {
        CompilerConfig {
            name: DEFAULT_COMPILER_NAME.to_string(),
            version: DEFAULT_SOLC_VERSION.to_string(),
            settings: CompilerSettings {
                optimizer: OptimizerSettings {
                    enabled: DEFAULT_OPTIMIZER_ENABLED,
                    runs: DEFAULT_OPTIMIZER_RUNS,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn test_location() -> FileLocation {
        FileLocation::from_path_string("/projects/demo/Praline.toml").unwrap()
    }

    #[test]
    fn default_manifest_reports_okexchain_constants() {
        let manifest = DeploymentManifest::default_manifest(&test_location()).unwrap();

        let network = manifest.networks.get("okexchain").unwrap();
        assert_eq!(network.gas_price, 1_000_000_000);
        assert_eq!(network.network_id, 66);
        assert_eq!(network.timeout_blocks, 200);
        assert!(network.skip_dry_run);
        assert_eq!(network.rpc_url, "https://exchainrpc.okex.org");
        assert_eq!(network.derivation_path, "m/44'/60'/0'/0/0");
        assert_eq!(
            network.mnemonic_file.to_string(),
            "/projects/demo/.mnemonic"
        );
    }

    #[test]
    fn default_manifest_reports_solc_constants() {
        let manifest = DeploymentManifest::default_manifest(&test_location()).unwrap();

        let compiler = manifest.compilers.get("solc").unwrap();
        assert_eq!(compiler.version, "0.8.4");
        assert!(compiler.settings.optimizer.enabled);
        assert_eq!(compiler.settings.optimizer.runs, 200);
    }

    #[test]
    fn partial_manifest_resolves_against_defaults() {
        let manifest_file: DeploymentManifestFile = toml::from_str(
            r#"
            [networks.okexchain]
            gas_price = 2_000_000_000

            [compilers.solc]
            version = "0.8.17"
            "#,
        )
        .unwrap();
        let manifest =
            DeploymentManifest::from_manifest_file(&manifest_file, &test_location()).unwrap();

        let network = manifest.networks.get("okexchain").unwrap();
        assert_eq!(network.gas_price, 2_000_000_000);
        assert_eq!(network.network_id, 66);
        assert_eq!(network.timeout_blocks, 200);

        let compiler = manifest.compilers.get("solc").unwrap();
        assert_eq!(compiler.version, "0.8.17");
        assert_eq!(compiler.settings.optimizer.runs, 200);
    }

    #[test]
    fn extra_networks_keep_the_builtin_one() {
        let manifest_file: DeploymentManifestFile = toml::from_str(
            r#"
            [networks.localnet]
            rpc_url = "http://127.0.0.1:8545"
            network_id = 1337
            skip_dry_run = false
            mnemonic_path = "secrets/.mnemonic"

            [compilers.solc.settings.optimizer]
            enabled = false
            runs = 1
            "#,
        )
        .unwrap();
        let manifest =
            DeploymentManifest::from_manifest_file(&manifest_file, &test_location()).unwrap();

        let localnet = manifest.networks.get("localnet").unwrap();
        assert_eq!(localnet.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(localnet.network_id, 1337);
        assert!(!localnet.skip_dry_run);
        assert_eq!(
            localnet.mnemonic_file.to_string(),
            "/projects/demo/secrets/.mnemonic"
        );

        assert!(manifest.networks.contains_key("okexchain"));
        assert_eq!(
            manifest.networks.get("okexchain").unwrap().network_id,
            66
        );

        let compiler = manifest.compilers.get("solc").unwrap();
        assert!(!compiler.settings.optimizer.enabled);
        assert_eq!(compiler.settings.optimizer.runs, 1);
    }

    #[test]
    fn serializes_with_consumer_facing_keys() {
        let manifest = DeploymentManifest::default_manifest(&test_location()).unwrap();
        let serialized = serde_json::to_value(&manifest).unwrap();

        let network = &serialized["networks"]["okexchain"];
        assert_eq!(network["gasPrice"], 1_000_000_000);
        assert_eq!(network["network_id"], 66);
        assert_eq!(network["timeoutBlocks"], 200);
        assert_eq!(network["skipDryRun"], true);

        let compiler = &serialized["compilers"]["solc"];
        assert_eq!(compiler["version"], "0.8.4");
        assert_eq!(compiler["settings"]["optimizer"]["enabled"], true);
        assert_eq!(compiler["settings"]["optimizer"]["runs"], 200);
    }

    #[test]
    fn mnemonic_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(".mnemonic")).unwrap();
        write!(
            file,
            "  abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about  \n"
        )
        .unwrap();

        let location = FileLocation::from_path(dir.path().join(MANIFEST_FILE_NAME));
        let manifest = DeploymentManifest::default_manifest(&location).unwrap();
        let network = manifest.networks.get("okexchain").unwrap();
        assert_eq!(
            network.get_mnemonic().unwrap(),
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        );
        assert_eq!(
            network.deployer_address().unwrap(),
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
    }

    #[test]
    fn missing_secret_only_fails_the_signer_factory() {
        let dir = tempfile::tempdir().unwrap();
        let location = FileLocation::from_path(dir.path().join(MANIFEST_FILE_NAME));

        // the manifest itself resolves fine without any secret on disk
        let manifest = DeploymentManifest::default_manifest(&location).unwrap();
        let network = manifest.networks.get("okexchain").unwrap();

        let err = network.wallet_provider().unwrap_err();
        assert!(err.contains("unable to read file"));
    }
}
