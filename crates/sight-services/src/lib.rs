// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Sight Service Layer

Services, the object-service registry that binds them to data objects, and
the application manager that starts them once their objects exist.

## Architecture

```text
┌─────────────────────────────────────────────────────────────────┐
│                     APPLICATION MANAGER                          │
│  inputs • object ids • auto-start / auto-update • proxy wiring   │
└────────────────────────────┬────────────────────────────────────┘
                             ↓ add_object / remove_object
┌─────────────────────────────────────────────────────────────────┐
│               OBJECT-SERVICE REGISTRY (OSR)                      │
│  (service, key, access) → object     object → [services]         │
│  registered / unregistered signals for produced outputs          │
└────────────────────────────┬────────────────────────────────────┘
                             ↓
┌─────────────────────────────────────────────────────────────────┐
│                   SERVICE INSTANCES                              │
│  lifecycle • bindings • signals & slots • optional worker        │
└─────────────────────────────────────────────────────────────────┘
```

## Usage

```rust,ignore
use sight_services::{Access, AppManager, ServiceContext};

let ctx = ServiceContext::new();
ctx.services.register("my::Reader", MyReader::default);

let manager = AppManager::new(&ctx, "Viewer");
manager.create()?;

let reader = manager.add_service("my::Reader", "reader", true, false)?;
reader.register_object("image", "image", Access::Input, true, false);

manager.start_services()?;               // reader waits for "image"
manager.add_object(image_handle, "image")?; // reader starts now
```
*/

pub mod app_manager;
pub mod context;
pub mod factory;
pub mod instance;
pub mod registry;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use app_manager::{AppManager, Input, InputType};
pub use context::ServiceContext;
pub use factory::ServiceFactory;
pub use instance::ServiceInstance;
pub use registry::{Association, ObjectService, ProxyConnections, DEFAULT_KEY};
pub use traits::{KeyConnections, Service};
pub use types::{
    Access, NotificationType, ObjectServiceConfig, RegistrationEvent, RegistryError,
    ServiceError, ServiceId, ServiceResult, ServiceState,
};
