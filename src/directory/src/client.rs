/*
   MyBerkeley campus account provisioning
   Copyright (C) The Regents of the University of California 2026

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use async_trait::async_trait;
use provision_common::config::AuthMode;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::DirectoryError;
use crate::interface::{
    home_path, principal_path, AclRule, Directory, IntegratedUserIds, Message, PrincipalKind,
    UserSearchHit,
};
use crate::profile::ProfileImport;

const USER_MANAGER: &str = "system/userManager";

// Sling reads posted parameters as ISO-8859-1 unless told otherwise.
const CHARSET_FIELD: (&str, &str) = ("_charset_", "utf-8");

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub mode: AuthMode,
}

/// [`Directory`] over the Sling REST servlets.
pub struct SlingDirectory {
    client: Client,
    base: Url,
    creds: Credentials,
}

type Form = Vec<(String, String)>;

fn form(fields: &[(&str, &str)]) -> Form {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl SlingDirectory {
    pub fn new(
        server_url: &str,
        creds: Credentials,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, DirectoryError> {
        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;
        Ok(SlingDirectory {
            client,
            base,
            creds,
        })
    }

    fn url(&self, path: &str) -> Result<Url, DirectoryError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.creds.mode {
            AuthMode::Basic => req.basic_auth(&self.creds.user, Some(&self.creds.password)),
            AuthMode::Form => req,
        }
    }

    async fn check(resp: Response) -> Result<Response, DirectoryError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(DirectoryError::Status {
                code: status.as_u16(),
                body,
            })
        }
    }

    async fn send_get(&self, url: Url) -> Result<Response, DirectoryError> {
        debug!("GET: {}", url);
        let req = self.authorize(self.client.get(url));
        Ok(req.send().await?)
    }

    async fn get_json(&self, url: Url) -> Result<Value, DirectoryError> {
        let resp = Self::check(self.send_get(url).await?).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Like [`get_json`](Self::get_json) but a 404 is reported as `None`.
    async fn get_json_opt(&self, url: Url) -> Result<Option<Value>, DirectoryError> {
        let resp = self.send_get(url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check(resp).await?;
        let body = resp.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn post(&self, path: &str, mut fields: Form) -> Result<Response, DirectoryError> {
        let url = self.url(path)?;
        if !fields.iter().any(|(k, _)| k == CHARSET_FIELD.0) {
            fields.push((CHARSET_FIELD.0.to_string(), CHARSET_FIELD.1.to_string()));
        }
        debug!("POST: {}", url);
        let req = self.authorize(self.client.post(url)).form(&fields);
        Self::check(req.send().await?).await
    }

    fn user_path(id: &str) -> String {
        format!("{}/user/{}", USER_MANAGER, id)
    }

    fn group_path(name: &str) -> String {
        format!("{}/group/{}", USER_MANAGER, name)
    }

    fn props_form(props: &[(&str, String)]) -> Form {
        props
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl Directory for SlingDirectory {
    #[instrument(level = "debug", skip_all)]
    async fn login(&self) -> Result<(), DirectoryError> {
        match self.creds.mode {
            AuthMode::Form => {
                self.post(
                    "system/sling/formlogin",
                    form(&[
                        ("sakaiauth:un", self.creds.user.as_str()),
                        ("sakaiauth:pw", self.creds.password.as_str()),
                        ("sakaiauth:login", "1"),
                    ]),
                )
                .await?;
            }
            AuthMode::Basic => {
                self.get_json(self.url("system/me.json")?).await?;
            }
        }
        info!("Logged in to {} as {}", self.base, self.creds.user);
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, DirectoryError> {
        Ok(self.get_props(id).await?.is_some())
    }

    async fn get_props(&self, id: &str) -> Result<Option<Value>, DirectoryError> {
        let url = self.url(&format!("{}.json", Self::user_path(id)))?;
        self.get_json_opt(url).await
    }

    #[instrument(level = "debug", skip(self, password, props))]
    async fn create_user(
        &self,
        id: &str,
        password: &str,
        props: &[(&str, String)],
    ) -> Result<(), DirectoryError> {
        let mut fields = form(&[(":name", id), ("pwd", password), ("pwdConfirm", password)]);
        fields.extend(Self::props_form(props));
        self.post(&format!("{}/user.create.html", USER_MANAGER), fields)
            .await?;
        Ok(())
    }

    async fn update_user(&self, id: &str, props: &[(&str, String)]) -> Result<(), DirectoryError> {
        self.post(
            &format!("{}.update.html", Self::user_path(id)),
            Self::props_form(props),
        )
        .await?;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), DirectoryError> {
        self.post(&format!("{}.delete.html", Self::user_path(id)), vec![])
            .await?;
        Ok(())
    }

    async fn create_group(&self, name: &str) -> Result<(), DirectoryError> {
        self.post(
            &format!("{}/group.create.html", USER_MANAGER),
            form(&[(":name", name)]),
        )
        .await?;
        Ok(())
    }

    async fn group_add_member(
        &self,
        group: &str,
        member: &str,
        kind: PrincipalKind,
    ) -> Result<(), DirectoryError> {
        let member = principal_path(member, kind);
        self.post(
            &format!("{}.update.html", Self::group_path(group)),
            form(&[(":member", member.as_str())]),
        )
        .await?;
        Ok(())
    }

    async fn group_remove_member(
        &self,
        group: &str,
        member: &str,
        kind: PrincipalKind,
    ) -> Result<(), DirectoryError> {
        let member = principal_path(member, kind);
        self.post(
            &format!("{}.update.html", Self::group_path(group)),
            form(&[(":member@Delete", member.as_str())]),
        )
        .await?;
        Ok(())
    }

    async fn group_members(&self, group: &str) -> Result<Vec<String>, DirectoryError> {
        let url = self.url(&format!("{}.json", Self::group_path(group)))?;
        let json = self.get_json(url).await?;
        let members = match json.get("members") {
            Some(Value::Array(members)) => members
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(member)) => vec![member.clone()],
            _ => vec![],
        };
        Ok(members)
    }

    async fn post_acl(&self, path: &str, rule: &AclRule) -> Result<(), DirectoryError> {
        let privilege = format!("privilege@{}", rule.privilege.as_str());
        self.post(
            &format!("{}.modifyAce.html", path),
            form(&[
                ("principalId", rule.principal.as_str()),
                (privilege.as_str(), rule.access.as_str()),
            ]),
        )
        .await?;
        Ok(())
    }

    async fn import_profile(&self, id: &str, profile: &ProfileImport) -> Result<(), DirectoryError> {
        let content = profile.to_json()?;
        self.post(
            &format!("{}/public/authprofile.profile.json", home_path(id)),
            form(&[
                (":operation", "import"),
                (":contentType", "json"),
                (":replace", "true"),
                (":replaceProperties", "true"),
                (":content", content.as_str()),
            ]),
        )
        .await?;
        Ok(())
    }

    async fn clear_profile_section(&self, id: &str, section: &str) -> Result<(), DirectoryError> {
        self.post(
            &format!("{}/public/authprofile/{}.profile.json", home_path(id), section),
            form(&[
                (":operation", "import"),
                (":contentType", "json"),
                (":replace", "true"),
                (":replaceProperties", "true"),
                (":removeTree", "true"),
                (":content", "{\"elements\":{}}"),
            ]),
        )
        .await?;
        Ok(())
    }

    async fn set_demographics(&self, id: &str, paths: &[String]) -> Result<(), DirectoryError> {
        if paths.is_empty() {
            return self.clear_demographics(id).await;
        }
        let fields = paths
            .iter()
            .map(|p| ("myb-demographics".to_string(), p.clone()))
            .collect();
        self.post(&format!("{}.myb-demographic.html", home_path(id)), fields)
            .await?;
        Ok(())
    }

    async fn clear_demographics(&self, id: &str) -> Result<(), DirectoryError> {
        self.post(
            &format!("{}.myb-demographic.html", home_path(id)),
            form(&[("myb-demographics@Delete", "")]),
        )
        .await?;
        Ok(())
    }

    async fn integrated_user_ids(&self) -> Result<IntegratedUserIds, DirectoryError> {
        let json = self
            .get_json(self.url("system/myberkeley/userIds.json")?)
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    async fn demographic_count(
        &self,
        context: &str,
        criteria: &str,
    ) -> Result<u64, DirectoryError> {
        let mut url = self.url(&format!("var/myberkeley/dynamiclists/{}.json", context))?;
        url.query_pairs_mut().append_pair("criteria", criteria);
        let json = self.get_json(url).await?;
        match json.get("count") {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| DirectoryError::InvalidJson(format!("Bad count {}", n))),
            Some(Value::String(s)) => s
                .parse::<u64>()
                .map_err(|e| DirectoryError::InvalidJson(format!("Bad count {}: {}", s, e))),
            _ => Err(DirectoryError::InvalidJson(
                "Dynamic list response has no count".to_string(),
            )),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<UserSearchHit>, DirectoryError> {
        let mut url = self.url("var/search/users.json")?;
        url.query_pairs_mut().append_pair("q", query);
        let json = self.get_json(url).await?;
        let hits = match json.get("results") {
            Some(Value::Array(results)) => results
                .iter()
                .filter_map(UserSearchHit::from_value)
                .collect(),
            _ => vec![],
        };
        Ok(hits)
    }

    async fn home_exists(&self, id: &str) -> Result<bool, DirectoryError> {
        let url = self.url(&format!("{}.json", home_path(id)))?;
        let resp = self.send_get(url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(resp).await?;
        Ok(true)
    }

    #[instrument(level = "debug", skip_all)]
    async fn send_message(&self, message: &Message) -> Result<(), DirectoryError> {
        let to = format!("internal:{}", message.to_group);
        self.post(
            &format!("{}/message.create.html", home_path(&message.from)),
            form(&[
                ("sakai:type", "internal"),
                ("sakai:sendstate", "pending"),
                ("sakai:messagebox", "outbox"),
                ("sakai:to", to.as_str()),
                ("sakai:from", message.from.as_str()),
                ("sakai:subject", message.subject.as_str()),
                ("sakai:body", message.body.as_str()),
                ("sakai:category", "message"),
            ]),
        )
        .await?;
        Ok(())
    }
}
