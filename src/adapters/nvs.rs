//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] and [`StoragePort`] for the pod controller.
//! Configuration is stored as postcard blobs: the lift tunables under one
//! key, the node identity (WiFi/MQTT credentials, pod number, antenna
//! selection) under another.
//!
//! All fields are range-checked before persistence — a bad write from the
//! command channel must not be able to disable the travel fail-safe or
//! zero the control tick.  ESP-IDF NVS commits are atomic per
//! `nvs_commit()`; the in-memory simulation achieves atomicity trivially.

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{LiftConfig, NodeConfig};
use crate::fleet::MAX_PODS;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "vlift";
const LIFT_CONFIG_KEY: &str = "liftcfg";
const NODE_CONFIG_KEY: &str = "nodecfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 2048;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            Ok(self
                .store
                .borrow()
                .get(&Self::composite_key(CONFIG_NAMESPACE, key))
                .cloned())
        }

        #[cfg(target_os = "espidf")]
        {
            let mut key_buf = [0u8; 16];
            let kb = key.as_bytes();
            let kl = kb.len().min(15);
            key_buf[..kl].copy_from_slice(&kb[..kl]);

            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {} for '{}'", e, key);
                    Ok(None)
                }
            }
        }
    }

    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(CONFIG_NAMESPACE, key), bytes.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let mut key_buf = [0u8; 16];
            let kb = key.as_bytes();
            let kl = kb.len().min(15);
            key_buf[..kl].copy_from_slice(&kb[..kl]);

            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("NvsAdapter: NVS write error {} for '{}'", e, key);
                ConfigError::IoError
            })
        }
    }
}

fn validate_lift_config(cfg: &LiftConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_PODS).contains(&cfg.pod_count) {
        return Err(ConfigError::ValidationFailed("pod_count must be 1–6"));
    }
    if !(10..=1_000).contains(&cfg.control_loop_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_loop_interval_ms must be 10–1000",
        ));
    }
    if !(500..=30_000).contains(&cfg.up_settle_ms) {
        return Err(ConfigError::ValidationFailed("up_settle_ms must be 500–30000"));
    }
    if !(500..=30_000).contains(&cfg.down_settle_ms) {
        return Err(ConfigError::ValidationFailed(
            "down_settle_ms must be 500–30000",
        ));
    }
    if cfg.max_travel_ms <= cfg.up_settle_ms.max(cfg.down_settle_ms) {
        return Err(ConfigError::ValidationFailed(
            "max_travel_ms must exceed both settle dwells",
        ));
    }
    if !(500..=30_000).contains(&cfg.long_press_ms) {
        return Err(ConfigError::ValidationFailed("long_press_ms must be 500–30000"));
    }
    if cfg.battery.max_volts <= cfg.battery.min_volts {
        return Err(ConfigError::ValidationFailed(
            "battery.max_volts must exceed battery.min_volts",
        ));
    }
    if cfg.battery.divider_ratio <= 0.0 || cfg.battery.multiplier <= 0.0 {
        return Err(ConfigError::ValidationFailed(
            "battery divider and multiplier must be positive",
        ));
    }
    if cfg.battery.adc_max == 0 || cfg.battery.adc_ref_volts <= 0.0 {
        return Err(ConfigError::ValidationFailed("battery ADC range invalid"));
    }
    Ok(())
}

fn validate_node_config(cfg: &NodeConfig) -> Result<(), ConfigError> {
    if usize::from(cfg.pod_number) >= MAX_PODS {
        return Err(ConfigError::ValidationFailed("pod_number must be 0–5"));
    }
    if cfg.mqtt_port == 0 {
        return Err(ConfigError::ValidationFailed("mqtt_port must be non-zero"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<LiftConfig, ConfigError> {
        match self.read_blob(LIFT_CONFIG_KEY)? {
            Some(bytes) => {
                let cfg: LiftConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded lift config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("NvsAdapter: no stored lift config, using defaults");
                Ok(LiftConfig::default())
            }
        }
    }

    fn save(&self, config: &LiftConfig) -> Result<(), ConfigError> {
        validate_lift_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(LIFT_CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: lift config saved ({} bytes)", bytes.len());
        Ok(())
    }

    fn load_node(&self) -> Result<NodeConfig, ConfigError> {
        match self.read_blob(NODE_CONFIG_KEY)? {
            Some(bytes) => {
                let cfg: NodeConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!(
                    "NvsAdapter: loaded node config (pod {}, ext_antenna={})",
                    cfg.pod_number, cfg.ext_antenna
                );
                Ok(cfg)
            }
            None => {
                info!("NvsAdapter: no stored node config, using defaults (pod 0)");
                Ok(NodeConfig {
                    mqtt_port: 1883,
                    ..Default::default()
                })
            }
        }
    }

    fn save_node(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        validate_node_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(NODE_CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: node config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = format!("{}::{}", namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = format!("{}::{}", namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = format!("{}::{}", namespace, key);
            self.store.borrow_mut().remove(&composite);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .contains_key(&format!("{}::{}", namespace, key))
        }

        #[cfg(target_os = "espidf")]
        {
            let mut probe = [0u8; 1];
            !matches!(
                self.read(namespace, key, &mut probe),
                Err(StorageError::NotFound)
            )
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn load_without_store_yields_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = nvs.load().unwrap();
        assert_eq!(cfg.pod_count, LiftConfig::default().pod_count);
        let node = nvs.load_node().unwrap();
        assert_eq!(node.pod_number, 0);
        assert_eq!(node.mqtt_port, 1883);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = LiftConfig {
            up_settle_ms: 9_000,
            ..Default::default()
        };
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap().up_settle_ms, 9_000);

        let node = NodeConfig {
            mqtt_server: "hub.local".into(),
            mqtt_port: 8883,
            pod_number: 1,
            ..Default::default()
        };
        nvs.save_node(&node).unwrap();
        let loaded = nvs.load_node().unwrap();
        assert_eq!(loaded.mqtt_server, "hub.local");
        assert_eq!(loaded.pod_number, 1);
    }

    #[test]
    fn validation_rejects_dangerous_values() {
        let nvs = NvsAdapter::new().unwrap();

        let no_failsafe = LiftConfig {
            max_travel_ms: 1_000,
            ..Default::default()
        };
        assert!(matches!(
            nvs.save(&no_failsafe),
            Err(ConfigError::ValidationFailed(_))
        ));

        let zero_tick = LiftConfig {
            control_loop_interval_ms: 0,
            ..Default::default()
        };
        assert!(nvs.save(&zero_tick).is_err());

        let inverted_battery = LiftConfig {
            battery: crate::config::BatteryCalibration {
                max_volts: 22.0,
                min_volts: 23.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(nvs.save(&inverted_battery).is_err());

        let bad_pod = NodeConfig {
            pod_number: 12,
            mqtt_port: 1883,
            ..Default::default()
        };
        assert!(nvs.save_node(&bad_pod).is_err());
    }

    #[test]
    fn storage_port_kv_roundtrip() {
        let mut nvs = NvsAdapter::new().unwrap();
        assert!(!nvs.exists("scratch", "blob"));
        nvs.write("scratch", "blob", &[1, 2, 3]).unwrap();
        assert!(nvs.exists("scratch", "blob"));

        let mut buf = [0u8; 8];
        let n = nvs.read("scratch", "blob", &mut buf).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);

        nvs.delete("scratch", "blob").unwrap();
        assert!(matches!(
            nvs.read("scratch", "blob", &mut buf),
            Err(StorageError::NotFound)
        ));
    }
}
