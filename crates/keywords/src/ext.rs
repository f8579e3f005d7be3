//! The Keywords extension: admin command surface plus the passive
//! keyword-reply path.

use {
    async_trait::async_trait,
    std::sync::Arc,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
    watchword_common::types::MessageEvent,
    watchword_config::{ExtensionState, StateStore},
    watchword_extensions::{
        DeliveryMode, Extension, ExtensionFactory, ExtensionHost, Reply, ReplyBody, ReplyDelivery,
        router::{self, RouteOutcome},
    },
};

use crate::{
    config::{ConfigSetError, KeywordConfig, TOGGLES},
    replies,
    table::{KeywordReply, KeywordTable},
};

pub const NAME: &str = "keywords";
pub const CONTROL_TOKEN: &str = "keyword";

struct State {
    table: KeywordTable,
    config: KeywordConfig,
    template: String,
}

impl State {
    fn to_document(&self) -> ExtensionState {
        ExtensionState {
            keywords: self.table.to_document(),
            config_data: self.config.to_document(),
            template_text: self.template.clone(),
        }
    }
}

/// Replies to configured keywords and lets admins manage the table over IM.
pub struct Keywords {
    host: ExtensionHost,
    delivery: ReplyDelivery,
    state: Mutex<State>,
}

impl Keywords {
    /// Build from persisted state. Missing or malformed state starts empty
    /// with the default template.
    pub async fn load(host: ExtensionHost) -> Self {
        let document = host.store.load(NAME).await;
        let table = KeywordTable::from_document(&document.keywords);
        let config = KeywordConfig::from_document(&document.config_data);
        let template = if document.template_text.is_empty() {
            replies::DEFAULT_TEMPLATE.to_owned()
        } else {
            document.template_text
        };
        let delivery = ReplyDelivery::new(host.gateway.clone(), host.directory.clone());
        Self {
            host,
            delivery,
            state: Mutex::new(State {
                table,
                config,
                template,
            }),
        }
    }

    #[must_use]
    pub fn factory() -> ExtensionFactory {
        Arc::new(|host| {
            Box::pin(async move { Ok(Arc::new(Keywords::load(host).await) as Arc<dyn Extension>) })
        })
    }

    /// Persist `next`, and only on success make it the live state. A failed
    /// save keeps the previous state authoritative and returns `None` so the
    /// caller withholds the confirmation.
    async fn commit(&self, next: State, confirmation: String) -> Option<Reply> {
        match self.host.store.save(NAME, &next.to_document()).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                *state = next;
                Some(Reply::regular(confirmation))
            }
            Err(err) => {
                warn!(%err, "could not persist keyword state, discarding change");
                None
            }
        }
    }

    /// Dispatch one admin command. Subcommands and keywords match on
    /// sanitized tokens; argument values come from the raw token at the
    /// same position.
    async fn handle_command(&self, event: &MessageEvent) -> Option<Reply> {
        let (tokens, raw) = router::token_pairs(&event.text);
        if tokens.first().map(String::as_str) != Some(CONTROL_TOKEN) {
            return Some(Reply::regular(replies::HELP));
        }

        match tokens.get(1).map(String::as_str) {
            None | Some("list") => Some(self.list().await),
            Some("add") => self.add(event, &tokens, &raw).await,
            Some("delete") => self.delete(&tokens).await,
            Some("quickadd") => self.quickadd(event, &tokens, &raw).await,
            Some("template") => self.template(event, &tokens).await,
            Some("config") => self.config(event, &tokens).await,
            Some("help") => Some(Reply::regular(replies::HELP)),
            Some(_) => Some(Reply::regular(replies::HELP)),
        }
    }

    async fn list(&self) -> Reply {
        let state = self.state.lock().await;
        if state.table.is_empty() {
            return Reply::regular(replies::LIST_EMPTY);
        }
        let mut text_lines = Vec::new();
        let mut template_lines = Vec::new();
        for (keyword, reply) in state.table.iter() {
            match reply {
                KeywordReply::Text(text) => {
                    text_lines.push(format!("- *{keyword}* : {text}"));
                }
                KeywordReply::Channels(channels) => {
                    template_lines.push(format!("- *{keyword}* : {}", channels.join(" ")));
                }
            }
        }
        let mut lines = vec![replies::LIST_HEADER.to_owned()];
        if !text_lines.is_empty() {
            lines.push("*Keywords without templates*".to_owned());
            lines.extend(text_lines);
        }
        if !template_lines.is_empty() {
            lines.push("*Keywords that use the template*".to_owned());
            lines.extend(template_lines);
        }
        Reply::regular(lines.join("\n"))
    }

    /// `keyword add <keyword> <reply text…>` — the reply text keeps its raw
    /// casing and formatting.
    async fn add(&self, event: &MessageEvent, tokens: &[String], raw: &[&str]) -> Option<Reply> {
        if tokens.len() < 4 {
            return Some(Reply::regular(replies::DID_NOT_UNDERSTAND));
        }
        let keyword = tokens[2].clone();
        if keyword.is_empty() {
            return Some(Reply::regular(replies::DID_NOT_UNDERSTAND));
        }
        let message = raw[3..].join(" ");

        let state = self.state.lock().await;
        let mut next = State {
            table: state.table.clone(),
            config: state.config,
            template: state.template.clone(),
        };
        drop(state);
        next.table.insert(keyword.clone(), KeywordReply::Text(message));

        info!(%keyword, user = %event.user, "keyword added");
        self.commit(
            next,
            replies::ADD_CONFIRMATION.replace("{keyword}", &keyword),
        )
        .await
    }

    /// `keyword delete <keyword>`.
    async fn delete(&self, tokens: &[String]) -> Option<Reply> {
        if tokens.len() < 3 {
            return Some(Reply::regular(replies::DID_NOT_UNDERSTAND));
        }
        let keyword = tokens[2].clone();

        let state = self.state.lock().await;
        if !state.table.contains(&keyword) {
            return Some(Reply::regular(replies::DELETE_UNKNOWN));
        }
        let mut next = State {
            table: state.table.clone(),
            config: state.config,
            template: state.template.clone(),
        };
        drop(state);
        next.table.remove(&keyword);

        info!(%keyword, "keyword deleted");
        self.commit(
            next,
            replies::DELETE_CONFIRMATION.replace("{keyword}", &keyword),
        )
        .await
    }

    /// `keyword quickadd <keyword> #chan1 #chan2…` — channel references are
    /// stored as given and resolved when a reply goes out.
    async fn quickadd(
        &self,
        event: &MessageEvent,
        tokens: &[String],
        raw: &[&str],
    ) -> Option<Reply> {
        if tokens.len() < 4 {
            return Some(Reply::regular(replies::DID_NOT_UNDERSTAND));
        }
        let keyword = tokens[2].clone();
        if keyword.is_empty() {
            return Some(Reply::regular(replies::DID_NOT_UNDERSTAND));
        }
        let channels: Vec<String> = raw[3..]
            .iter()
            .filter(|token| {
                (token.starts_with('<') && token.ends_with('>')) || token.starts_with('#')
            })
            .map(|token| (*token).to_owned())
            .collect();
        if channels.is_empty() {
            return Some(Reply::regular(replies::QUICKADD_MISSING_CHANNEL));
        }

        let state = self.state.lock().await;
        let mut next = State {
            table: state.table.clone(),
            config: state.config,
            template: state.template.clone(),
        };
        drop(state);
        next.table
            .insert(keyword.clone(), KeywordReply::Channels(channels));

        info!(%keyword, user = %event.user, "template keyword added");
        self.commit(
            next,
            replies::ADD_CONFIRMATION.replace("{keyword}", &keyword),
        )
        .await
    }

    /// `keyword template <new template…>` — raw text, must carry the
    /// `{channels}` placeholder.
    async fn template(&self, event: &MessageEvent, tokens: &[String]) -> Option<Reply> {
        if tokens.len() < 3 {
            return Some(Reply::regular(replies::DID_NOT_UNDERSTAND));
        }
        let template = rest_after_tokens(&event.text, 2);
        if !template.contains(watchword_extensions::CHANNELS_PLACEHOLDER) {
            return Some(Reply::regular(replies::TEMPLATE_MISSING_PLACEHOLDER));
        }

        let state = self.state.lock().await;
        let next = State {
            table: state.table.clone(),
            config: state.config,
            template,
        };
        drop(state);

        info!(user = %event.user, "keyword template replaced");
        self.commit(next, replies::TEMPLATE_CONFIRMATION.to_owned())
            .await
    }

    /// `keyword config` lists the schema; `keyword config <key> <value>`
    /// mutates one toggle.
    async fn config(&self, event: &MessageEvent, tokens: &[String]) -> Option<Reply> {
        if tokens.len() < 4 {
            return Some(self.config_list().await);
        }
        let key = tokens[2].as_str();
        let value = tokens[3].as_str();

        let state = self.state.lock().await;
        let mut next = State {
            table: state.table.clone(),
            config: state.config,
            template: state.template.clone(),
        };
        drop(state);

        match next.config.set(key, value) {
            Ok(()) => {
                info!(key, value, user = %event.user, "configuration changed");
                self.commit(next, replies::CONFIG_CONFIRMATION.to_owned()).await
            }
            Err(ConfigSetError::UnknownKey) => {
                Some(Reply::regular(replies::CONFIG_UNKNOWN_KEY))
            }
            Err(ConfigSetError::InvalidValue) => {
                Some(Reply::regular(replies::CONFIG_INVALID_VALUE))
            }
        }
    }

    async fn config_list(&self) -> Reply {
        let state = self.state.lock().await;
        let mut lines = vec![replies::CONFIG_HEADER.to_owned()];
        for spec in TOGGLES {
            let current = state.config.get(spec.key).unwrap_or_default();
            lines.push(format!(
                "*{}* : {} {} - Current value: {current}",
                spec.key,
                spec.description,
                spec.kind.expected(),
            ));
        }
        lines.push(String::new());
        lines.push(replies::CONFIG_FOOTER.to_owned());
        Reply::regular(lines.join("\n"))
    }

    /// The passive path: match the message against the table and deliver a
    /// reply through the toggled modes.
    async fn keyword_reply(&self, event: &MessageEvent, sanitized: &str) {
        let (body, modes, suppress_for_admins) = {
            let state = self.state.lock().await;
            if event.is_thread_child() && !state.config.reply_to_replies {
                return;
            }
            let Some((keyword, reply)) = state.table.find_match(sanitized) else {
                return;
            };
            info!(keyword, user = %event.user, "keyword matched");
            let body = match reply {
                KeywordReply::Text(text) => ReplyBody::Text(text.clone()),
                KeywordReply::Channels(channels) => ReplyBody::ChannelList {
                    template: state.template.clone(),
                    channels: channels.clone(),
                },
            };
            let mut modes = Vec::new();
            if state.config.reply_in_thread {
                modes.push(DeliveryMode::Thread);
            }
            if state.config.reply_in_ephemeral {
                modes.push(DeliveryMode::Ephemeral);
            }
            (body, modes, !state.config.reply_to_admins)
        };

        if modes.is_empty() {
            debug!("keyword matched but every reply mode is off");
            return;
        }

        // The admin check costs a lookup, so it only runs when the toggle
        // actually suppresses someone.
        if suppress_for_admins {
            match self.host.directory.is_admin_or_owner(&event.user).await {
                Ok(true) => {
                    debug!(user = %event.user, "keyword reply to admin suppressed");
                    return;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(%err, "admin lookup failed, skipping keyword reply");
                    return;
                }
            }
        }

        let reply = Reply { body, modes };
        if let Err(err) = self.delivery.send(event, &reply).await {
            warn!(%err, "could not deliver keyword reply");
        }
    }
}

/// Raw text after the first `skip` whitespace-separated tokens, preserving
/// the rest verbatim.
fn rest_after_tokens(text: &str, skip: usize) -> String {
    let mut remainder = text;
    for _ in 0..skip {
        remainder = match remainder.trim_start().split_once(char::is_whitespace) {
            Some((_, rest)) => rest,
            None => return String::new(),
        };
    }
    remainder.trim_start().to_owned()
}

#[async_trait]
impl Extension for Keywords {
    fn name(&self) -> &str {
        NAME
    }

    async fn on_message(&self, event: &MessageEvent) -> anyhow::Result<()> {
        let sanitized = router::sanitize(&event.text);

        if router::has_control_token(&sanitized, CONTROL_TOKEN) {
            let outcome = match router::route_command(
                event,
                &self.host.directory,
                self.host.gateway.as_ref(),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%err, "command routing failed, aborting");
                    return Ok(());
                }
            };
            if outcome == RouteOutcome::Command {
                if let Some(reply) = self.handle_command(event).await {
                    if let Err(err) = self.delivery.send(event, &reply).await {
                        warn!(%err, "could not deliver command reply");
                    }
                }
            }
            return Ok(());
        }

        self.keyword_reply(event, &sanitized).await;
        Ok(())
    }

    fn help(&self) -> String {
        replies::HELP.to_owned()
    }
}
