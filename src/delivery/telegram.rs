use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Recipient};

use super::Channel;
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::render::ChartImage;

/// Sends messages through the Telegram Bot API.
pub struct TelegramChannel {
    bot: Bot,
    recipient: Recipient,
}

/// Numeric ids address chats and groups; anything else is a public
/// `@channel` username.
pub fn parse_recipient(chat_id: &str) -> Result<Recipient> {
    let chat_id = chat_id.trim();
    if let Ok(id) = chat_id.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if chat_id.len() > 1 && chat_id.starts_with('@') {
        return Ok(Recipient::ChannelUsername(chat_id.to_string()));
    }
    Err(Error::Config(format!(
        "telegram.chat_id must be a number or @channel, got '{chat_id}'"
    )))
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Ok(Self {
            bot: Bot::new(&config.token),
            recipient: parse_recipient(&config.chat_id)?,
        })
    }
}

impl Channel for TelegramChannel {
    async fn send_text(&self, body: &str) -> Result<()> {
        self.bot
            .send_message(self.recipient.clone(), body.to_string())
            .await?;
        log::info!("Sent text message ({} chars)", body.chars().count());
        Ok(())
    }

    async fn send_image(&self, image: &ChartImage, caption: Option<&str>) -> Result<()> {
        let photo = InputFile::memory(image.bytes.clone()).file_name(image.file_name.clone());
        let mut request = self.bot.send_photo(self.recipient.clone(), photo);
        if let Some(caption) = caption {
            request = request.caption(caption.to_string());
        }
        request.await?;
        log::info!("Sent image {} ({} bytes)", image.file_name, image.bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient() {
        assert_eq!(
            parse_recipient("-1001234567890").unwrap(),
            Recipient::Id(ChatId(-1001234567890))
        );
        assert_eq!(
            parse_recipient("@daily_reports").unwrap(),
            Recipient::ChannelUsername("@daily_reports".into())
        );
        assert!(parse_recipient("daily reports").is_err());
        assert!(parse_recipient("@").is_err());
    }

    #[test]
    fn test_new_rejects_bad_chat_id() {
        let config = TelegramConfig {
            token: "123:abc".into(),
            chat_id: "".into(),
        };
        assert!(TelegramChannel::new(&config).is_err());
    }
}
