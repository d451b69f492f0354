use crate::errors::CatalogError;
use crate::model::{Group, Host};
use serde::{Deserialize, Serialize};

/// Hosts and profiles, each kept in insertion order with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "host", skip_serializing_if = "Vec::is_empty")]
    hosts: Vec<Host>,
    #[serde(default, rename = "group", skip_serializing_if = "Vec::is_empty")]
    groups: Vec<Group>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from raw parts, rejecting duplicate names and memberships
    /// that point at unknown hosts.
    pub fn from_parts(hosts: Vec<Host>, groups: Vec<Group>) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::new();
        for host in hosts {
            catalog.add_host(host)?;
        }
        for group in groups {
            catalog.add_group(group)?;
        }
        Ok(catalog)
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn host_names(&self) -> Vec<String> {
        self.hosts.iter().map(|h| h.name.clone()).collect()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.groups.is_empty()
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut Group, CatalogError> {
        self.groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| CatalogError::UnknownGroup(name.to_string()))
    }

    pub fn add_host(&mut self, host: Host) -> Result<(), CatalogError> {
        if self.host(&host.name).is_some() {
            return Err(CatalogError::DuplicateHost(host.name));
        }
        self.hosts.push(host);
        Ok(())
    }

    /// Replace the host called `old_name`. A rename is carried into every
    /// profile that lists the host.
    pub fn update_host(&mut self, old_name: &str, host: Host) -> Result<(), CatalogError> {
        let idx = self
            .hosts
            .iter()
            .position(|h| h.name == old_name)
            .ok_or_else(|| CatalogError::UnknownHost(old_name.to_string()))?;

        if host.name != old_name && self.host(&host.name).is_some() {
            return Err(CatalogError::DuplicateHost(host.name));
        }

        if host.name != old_name {
            for group in &mut self.groups {
                for member in &mut group.hosts {
                    if member == old_name {
                        *member = host.name.clone();
                    }
                }
            }
        }
        self.hosts[idx] = host;
        Ok(())
    }

    /// Remove a host and drop it from every profile.
    pub fn remove_host(&mut self, name: &str) -> Result<Host, CatalogError> {
        let idx = self
            .hosts
            .iter()
            .position(|h| h.name == name)
            .ok_or_else(|| CatalogError::UnknownHost(name.to_string()))?;
        for group in &mut self.groups {
            group.hosts.retain(|h| h != name);
        }
        Ok(self.hosts.remove(idx))
    }

    pub fn add_group(&mut self, group: Group) -> Result<(), CatalogError> {
        if self.group(&group.name).is_some() {
            return Err(CatalogError::DuplicateGroup(group.name));
        }
        self.check_members(&group)?;
        self.groups.push(group);
        Ok(())
    }

    pub fn update_group(&mut self, old_name: &str, group: Group) -> Result<(), CatalogError> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.name == old_name)
            .ok_or_else(|| CatalogError::UnknownGroup(old_name.to_string()))?;

        if group.name != old_name && self.group(&group.name).is_some() {
            return Err(CatalogError::DuplicateGroup(group.name));
        }
        self.check_members(&group)?;
        self.groups[idx] = group;
        Ok(())
    }

    pub fn remove_group(&mut self, name: &str) -> Result<Group, CatalogError> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| CatalogError::UnknownGroup(name.to_string()))?;
        Ok(self.groups.remove(idx))
    }

    pub fn assign(&mut self, host: &str, group: &str) -> Result<(), CatalogError> {
        if self.host(host).is_none() {
            return Err(CatalogError::UnknownHost(host.to_string()));
        }
        let entry = self.group_mut(group)?;
        if entry.contains(host) {
            return Err(CatalogError::AlreadyMember {
                host: host.to_string(),
                group: group.to_string(),
            });
        }
        entry.hosts.push(host.to_string());
        Ok(())
    }

    pub fn unassign(&mut self, host: &str, group: &str) -> Result<(), CatalogError> {
        let entry = self.group_mut(group)?;
        let before = entry.hosts.len();
        entry.hosts.retain(|h| h != host);
        if entry.hosts.len() == before {
            return Err(CatalogError::NotMember {
                host: host.to_string(),
                group: group.to_string(),
            });
        }
        Ok(())
    }

    /// Hosts of a profile, in membership order.
    pub fn members(&self, group: &str) -> Result<Vec<&Host>, CatalogError> {
        let entry = self
            .group(group)
            .ok_or_else(|| CatalogError::UnknownGroup(group.to_string()))?;
        entry
            .hosts
            .iter()
            .map(|name| {
                self.host(name)
                    .ok_or_else(|| CatalogError::UnknownHost(name.clone()))
            })
            .collect()
    }

    /// Profiles that list `host`.
    pub fn groups_of(&self, host: &str) -> Vec<&Group> {
        self.groups.iter().filter(|g| g.contains(host)).collect()
    }

    /// Re-check a deserialised catalog for duplicate names and dangling members.
    pub fn validate(&self) -> Result<(), CatalogError> {
        Catalog::from_parts(self.hosts.clone(), self.groups.clone()).map(|_| ())
    }

    fn check_members(&self, group: &Group) -> Result<(), CatalogError> {
        let mut seen: Vec<&str> = Vec::with_capacity(group.hosts.len());
        for member in &group.hosts {
            if self.host(member).is_none() {
                return Err(CatalogError::UnknownHost(member.clone()));
            }
            if seen.contains(&member.as_str()) {
                return Err(CatalogError::AlreadyMember {
                    host: member.clone(),
                    group: group.name.clone(),
                });
            }
            seen.push(member);
        }
        Ok(())
    }
}
