// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::audit::backend::MemoryAuditSink;
use crate::ca::{Service, ServiceState};
use crate::config::Config;
use crate::directory::Entry;
use crate::directory::backend::MemoryDirectory;
use crate::directory::backend::memory::PASSWORD_ATTRIBUTE;
use crate::plugin_manager::PluginManager;
use crate::usergroup::MEMBER_ATTRIBUTE;

/// Service state backed by the in-memory audit sink and directory.
///
/// The directory holds `jdoe` and the agent `agent` (both with the password
/// `secret`); only `agent` is a member of the default agent group.
pub(crate) struct TestEnv {
    pub state: ServiceState,
    pub audit: MemoryAuditSink,
    pub directory: MemoryDirectory,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        Self::with_plugins(config, PluginManager::default().with_builtin_policies()).await
    }

    pub async fn with_plugins(config: Config, mut plugin_manager: PluginManager) -> Self {
        let audit = MemoryAuditSink::default();
        let directory = MemoryDirectory::default();
        seed(&directory, &config).await;
        plugin_manager.register_audit_sink(&config.audit.driver, Arc::new(audit.clone()));
        plugin_manager.register_directory(&config.directory.driver, Arc::new(directory.clone()));
        let state = Service::build(config, plugin_manager).unwrap();
        Self {
            state,
            audit,
            directory,
        }
    }
}

async fn seed(directory: &MemoryDirectory, config: &Config) {
    let people = config.directory.get_user_base_dn();
    let groups = config.directory.get_group_base_dn();
    directory.add_entry(Entry::new(&people)).await;
    directory.add_entry(Entry::new(&groups)).await;
    for uid in ["jdoe", "agent"] {
        directory
            .add_entry(
                Entry::new(format!("uid={uid},{people}"))
                    .with("uid", uid)
                    .with("mail", format!("{uid}@example.com"))
                    .with(PASSWORD_ATTRIBUTE, "secret"),
            )
            .await;
    }
    directory
        .add_entry(
            Entry::new(format!("cn={},{groups}", config.agent.group))
                .with("cn", &config.agent.group)
                .with(MEMBER_ATTRIBUTE, format!("uid=agent,{people}")),
        )
        .await;
}
