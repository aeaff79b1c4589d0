//! Drives one kind of child object towards its desired state.
//!
//! [`ensure`] is the only entry point: it is generic over a [`ChildKind`], which
//! tells it whether the kind is wanted, what to generate and how to find leftovers.

use kube::Resource;
use log::{debug, info};

use crate::crd::microservice::Microservice;
use crate::errors::Error;
use crate::store::{namespace_and_name, Store, StoreObject};
use crate::utils::{is_owned_by, is_subset, object_key};

pub mod kinds;

/// How to find the objects of a kind that belong to a Microservice.
pub enum Cleanup {
    /// Deterministic names, one per object.
    ByName(Vec<String>),
    /// Every object carrying the Microservice's uid in its owner references.
    ByOwner,
}

pub trait ChildKind {
    type Object: StoreObject;

    const NAME: &'static str;

    fn wanted(microservice: &Microservice) -> bool;

    /// Left untouched even though wanted.
    fn overridden(_microservice: &Microservice) -> bool {
        false
    }

    fn generate(microservice: &Microservice) -> Result<Vec<Self::Object>, Error>;

    fn cleanup(microservice: &Microservice) -> Result<Cleanup, Error>;

    /// Copy fields the store fills in itself from `current` into `desired`, so an
    /// update never resets them.
    fn merge_auto_assigned(_desired: &mut Self::Object, _current: &Self::Object) {}
}

/// Create, update or delete the objects of kind `C` so they match `microservice`.
///
/// Every step is idempotent: a second call against an unchanged store issues no writes.
pub async fn ensure<C: ChildKind, S: Store>(store: &S, microservice: &Microservice) -> Result<(), Error> {
    if !C::wanted(microservice) {
        return remove_all::<C, S>(store, microservice).await;
    }
    if C::overridden(microservice) {
        info!(
            "{} of Microservice '{}' is overridden, leaving it alone",
            C::NAME,
            object_key(microservice)
        );
        return Ok(());
    }

    let desired = C::generate(microservice)?;
    let mut names = Vec::with_capacity(desired.len());
    for obj in desired {
        names.push(obj.meta().name.clone().unwrap_or_default());
        apply::<C, S>(store, obj).await?;
    }

    if let Cleanup::ByOwner = C::cleanup(microservice)? {
        prune::<C, S, _>(store, microservice, |name| !names.iter().any(|wanted| wanted == name)).await?;
    }
    Ok(())
}

async fn apply<C: ChildKind, S: Store>(store: &S, mut desired: C::Object) -> Result<(), Error> {
    let (namespace, name) = namespace_and_name(&desired)?;

    let current = match store.get::<C::Object>(&namespace, &name).await? {
        Some(current) => current,
        None => {
            store.create(&desired).await?;
            info!("Created {} '{}/{}'", C::NAME, namespace, name);
            return Ok(());
        }
    };

    C::merge_auto_assigned(&mut desired, &current);
    desired.meta_mut().resource_version = current.meta().resource_version.clone();

    if is_subset(&serde_json::to_value(&desired)?, &serde_json::to_value(&current)?) {
        debug!("{} '{}/{}' is up to date", C::NAME, namespace, name);
        return Ok(());
    }
    store.update(&desired).await?;
    info!("Updated {} '{}/{}'", C::NAME, namespace, name);
    Ok(())
}

async fn remove_all<C: ChildKind, S: Store>(store: &S, microservice: &Microservice) -> Result<(), Error> {
    let namespace = microservice
        .metadata
        .namespace
        .as_deref()
        .ok_or(Error::MissingKey(".metadata.namespace"))?;

    match C::cleanup(microservice)? {
        Cleanup::ByName(names) => {
            for name in names {
                if store.get::<C::Object>(namespace, &name).await?.is_none() {
                    continue;
                }
                if store.delete::<C::Object>(namespace, &name).await? {
                    info!("Deleted {} '{}/{}'", C::NAME, namespace, name);
                }
            }
            Ok(())
        }
        Cleanup::ByOwner => prune::<C, S, _>(store, microservice, |_| true).await,
    }
}

/// Delete owned objects of kind `C` whose name matches `unwanted`.
async fn prune<C, S, F>(store: &S, microservice: &Microservice, unwanted: F) -> Result<(), Error>
where
    C: ChildKind,
    S: Store,
    F: Fn(&str) -> bool,
{
    let namespace = microservice
        .metadata
        .namespace
        .as_deref()
        .ok_or(Error::MissingKey(".metadata.namespace"))?;
    let uid = microservice.metadata.uid.as_deref().ok_or(Error::MissingKey(".metadata.uid"))?;

    let owned = store
        .list::<C::Object>(Some(namespace))
        .await?
        .into_iter()
        .filter(|obj| is_owned_by(obj.meta(), uid));
    for obj in owned {
        let name = obj.meta().name.clone().unwrap_or_default();
        if !unwanted(&name) {
            continue;
        }
        if store.delete::<C::Object>(namespace, &name).await? {
            info!("Deleted {} '{}/{}'", C::NAME, namespace, name);
        }
    }
    Ok(())
}
