//! Directory of users and shops, caller resolution, and bootstrap.
//!
//! Directory mutations are reserved for the authority. Each record and its
//! registry entry are committed in one unit of work.

use tracing::{info, warn};

use super::keys::{shop_key, user_key, validate_identity};
use super::registry::{self, Registry};
use super::{Caller, CardLedger};
use crate::config::Settings;
use crate::entities::{Role, Shop, User};
use crate::errors::{Error, Result};
use crate::store::{LedgerStore, UnitOfWork};

fn require_authority(action: &'static str, caller: &Caller) -> Result<()> {
    super::lifecycle::check_role(action, caller, Role::Authority)
}

fn validate_user(user: &User) -> Result<()> {
    validate_identity("user", &user.identity)?;
    if Role::from_affiliation(user.affiliation).is_none() {
        return Err(Error::invalid(format!(
            "unknown affiliation {}",
            user.affiliation
        )));
    }
    Ok(())
}

impl<S: LedgerStore> CardLedger<S> {
    /// Resolves a registered caller. Unknown identities may not call the ledger.
    pub async fn resolve_caller(&self, identity: &str) -> Result<Caller> {
        let uow = UnitOfWork::new(self.store());
        match uow.load::<User>(&user_key(identity)).await? {
            Some(user) => Ok(Caller::new(identity, user.role()?)),
            None => {
                warn!("Call from unregistered identity '{}'", identity);
                Err(Error::denied(
                    "resolve caller",
                    format!("'{identity}' is not a registered user"),
                ))
            }
        }
    }

    /// Role of a registered user.
    pub async fn role_of(&self, identity: &str) -> Result<Role> {
        let uow = UnitOfWork::new(self.store());
        uow.load::<User>(&user_key(identity))
            .await?
            .ok_or_else(|| Error::not_found("user", identity))?
            .role()
    }

    /// Registers a new user.
    pub async fn add_user(&mut self, caller: &Caller, user: User) -> Result<()> {
        require_authority("add_user", caller)?;
        validate_user(&user)?;
        let key = user_key(&user.identity);
        let mut uow = UnitOfWork::new(self.store());
        if uow.exists(&key).await? {
            return Err(Error::already_exists("user", user.identity));
        }
        uow.put(&key, &user)?;
        registry::USERS.append(&mut uow, [user.identity.clone()]).await?;
        uow.commit().await?;
        info!("User '{}' added as {}", user.identity, user.affiliation);
        Ok(())
    }

    /// Replaces an existing user's record.
    pub async fn update_user(&mut self, caller: &Caller, user: User) -> Result<()> {
        require_authority("update_user", caller)?;
        validate_user(&user)?;
        let key = user_key(&user.identity);
        let mut uow = UnitOfWork::new(self.store());
        if !uow.exists(&key).await? {
            return Err(Error::not_found("user", user.identity));
        }
        uow.put(&key, &user)?;
        uow.commit().await?;
        info!("User '{}' updated", user.identity);
        Ok(())
    }

    /// Removes a user and its registry entry.
    pub async fn delete_user(&mut self, caller: &Caller, identity: &str) -> Result<()> {
        require_authority("delete_user", caller)?;
        self.delete_entry(&registry::USERS, "user", &user_key(identity), identity)
            .await?;
        info!("User '{}' deleted", identity);
        Ok(())
    }

    /// Every registered user.
    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.list_entries(&registry::USERS, user_key).await
    }

    /// One user's record.
    pub async fn get_user_detail(&self, identity: &str) -> Result<User> {
        UnitOfWork::new(self.store())
            .load(&user_key(identity))
            .await?
            .ok_or_else(|| Error::not_found("user", identity))
    }

    /// Registers a new shop.
    pub async fn add_shop(&mut self, caller: &Caller, shop: Shop) -> Result<()> {
        require_authority("add_shop", caller)?;
        validate_identity("shop", &shop.shop_id)?;
        let key = shop_key(&shop.shop_id);
        let mut uow = UnitOfWork::new(self.store());
        if uow.exists(&key).await? {
            return Err(Error::already_exists("shop", shop.shop_id));
        }
        uow.put(&key, &shop)?;
        registry::SHOPS.append(&mut uow, [shop.shop_id.clone()]).await?;
        uow.commit().await?;
        info!("Shop '{}' added", shop.shop_id);
        Ok(())
    }

    /// Replaces an existing shop's record.
    pub async fn update_shop(&mut self, caller: &Caller, shop: Shop) -> Result<()> {
        require_authority("update_shop", caller)?;
        let key = shop_key(&shop.shop_id);
        let mut uow = UnitOfWork::new(self.store());
        if !uow.exists(&key).await? {
            return Err(Error::not_found("shop", shop.shop_id));
        }
        uow.put(&key, &shop)?;
        uow.commit().await?;
        info!("Shop '{}' updated", shop.shop_id);
        Ok(())
    }

    /// Removes a shop and its registry entry.
    pub async fn delete_shop(&mut self, caller: &Caller, shop_id: &str) -> Result<()> {
        require_authority("delete_shop", caller)?;
        self.delete_entry(&registry::SHOPS, "shop", &shop_key(shop_id), shop_id)
            .await?;
        info!("Shop '{}' deleted", shop_id);
        Ok(())
    }

    /// Every registered shop.
    pub async fn get_shops(&self) -> Result<Vec<Shop>> {
        self.list_entries(&registry::SHOPS, shop_key).await
    }

    /// One shop's record.
    pub async fn get_shop_detail(&self, shop_id: &str) -> Result<Shop> {
        UnitOfWork::new(self.store())
            .load(&shop_key(shop_id))
            .await?
            .ok_or_else(|| Error::not_found("shop", shop_id))
    }

    /// Creates the registries, the administrator, and configured seed entries
    /// that do not exist yet. Running it again changes nothing.
    pub async fn bootstrap(&mut self, settings: &Settings) -> Result<()> {
        let mut uow = UnitOfWork::new(self.store());
        for registry in registry::ALL {
            registry.ensure(&mut uow).await?;
        }

        let admin = settings.admin.to_user();
        let users = std::iter::once(&admin).chain(settings.users.iter());
        for user in users {
            validate_user(user)?;
            let key = user_key(&user.identity);
            if !uow.exists(&key).await? {
                uow.put(&key, user)?;
                registry::USERS.append(&mut uow, [user.identity.clone()]).await?;
                info!("Seeded user '{}'", user.identity);
            }
        }
        for shop in &settings.shops {
            validate_identity("shop", &shop.shop_id)?;
            let key = shop_key(&shop.shop_id);
            if !uow.exists(&key).await? {
                uow.put(&key, shop)?;
                registry::SHOPS.append(&mut uow, [shop.shop_id.clone()]).await?;
                info!("Seeded shop '{}'", shop.shop_id);
            }
        }
        uow.commit().await
    }

    async fn delete_entry(
        &self,
        registry: &Registry,
        kind: &'static str,
        key: &str,
        id: &str,
    ) -> Result<()> {
        let mut uow = UnitOfWork::new(self.store());
        if !uow.exists(key).await? {
            return Err(Error::not_found(kind, id));
        }
        uow.delete(key);
        registry.remove(&mut uow, id).await?;
        uow.commit().await
    }

    async fn list_entries<T>(&self, registry: &Registry, key_of: fn(&str) -> String) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let uow = UnitOfWork::new(self.store());
        let mut entries = Vec::new();
        for id in registry.ids(&uow).await? {
            match uow.load::<T>(&key_of(&id)).await? {
                Some(entry) => entries.push(entry),
                None => warn!("Registry '{}' lists missing id '{}'", registry.key(), id),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{admin, seeded_ledger};

    fn consumer(identity: &str) -> User {
        User {
            identity: identity.to_string(),
            name: identity.to_string(),
            affiliation: Role::Consumer.affiliation(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let before = ledger.store().snapshot()?;
        ledger.bootstrap(&Settings::default()).await?;
        assert_eq!(ledger.store().snapshot()?, before);
        assert_eq!(ledger.role_of("admin").await?, Role::Authority);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_lifecycle() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let admin = admin();
        ledger.add_user(&admin, consumer("C9")).await?;
        assert!(matches!(
            ledger.add_user(&admin, consumer("C9")).await,
            Err(Error::AlreadyExists { .. })
        ));
        assert!(ledger.get_users().await?.iter().any(|u| u.identity == "C9"));

        let mut renamed = consumer("C9");
        renamed.name = "Nine".to_string();
        ledger.update_user(&admin, renamed).await?;
        assert_eq!(ledger.get_user_detail("C9").await?.name, "Nine");

        ledger.delete_user(&admin, "C9").await?;
        assert!(matches!(
            ledger.get_user_detail("C9").await,
            Err(Error::NotFound { .. })
        ));
        assert!(!ledger.get_users().await?.iter().any(|u| u.identity == "C9"));
        assert!(matches!(
            ledger.delete_user(&admin, "C9").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_requires_authority() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let shop = ledger.resolve_caller("S1").await?;
        assert!(matches!(
            ledger.add_user(&shop, consumer("C9")).await,
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            ledger.delete_shop(&shop, "S1").await,
            Err(Error::PermissionDenied { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_affiliation_is_rejected() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let mut user = consumer("C9");
        user.affiliation = 7;
        assert!(matches!(
            ledger.add_user(&admin(), user).await,
            Err(Error::InvalidArgument { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_shop_lifecycle() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let admin = admin();
        let shop = Shop {
            shop_id: "S9".to_string(),
            shop_name: "Night Market".to_string(),
            ..Shop::default()
        };
        ledger.add_shop(&admin, shop.clone()).await?;
        assert_eq!(ledger.get_shop_detail("S9").await?, shop);
        assert!(matches!(
            ledger.update_shop(&admin, Shop { shop_id: "S404".to_string(), ..Shop::default() }).await,
            Err(Error::NotFound { .. })
        ));
        ledger.delete_shop(&admin, "S9").await?;
        assert!(!ledger.get_shops().await?.iter().any(|s| s.shop_id == "S9"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unregistered_caller_is_denied() -> Result<()> {
        let ledger = seeded_ledger().await?;
        assert!(matches!(
            ledger.resolve_caller("mallory").await,
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            ledger.role_of("mallory").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
