use crate::error::{AppError, Result};

pub const USAGE: &str = "\
usage: novelty <command> [args]

commands:
  list                              show configured feeds
  discover <url>                    list the feeds a page offers
  add <title> <url>                 add a feed
  remove <pos>                      remove the feed at a position
  swap <a> <b>                      swap two feeds
  set-url <title> <url>             point a feed at a new URL
  refresh [pos]                     refresh all feeds, or one
  news [pos]                        show stored articles, for all feeds or one
  read <pos> <article-id>           mark an article read
  unread <pos> <article-id>         mark an article unread
  bookmark <pos> <article-id>       bookmark an article
  unbookmark <pos> <article-id>     remove a bookmark
  bookmarks                         show bookmarked articles
  cleanup                           purge expired articles
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Discover(String),
    Add { title: String, url: String },
    Remove(usize),
    Swap(usize, usize),
    SetUrl { title: String, url: String },
    Refresh(Option<usize>),
    News(Option<usize>),
    MarkRead { position: usize, article_id: String, read: bool },
    Bookmark { position: usize, article_id: String, bookmarked: bool },
    Bookmarks,
    Cleanup,
    Help,
}

/// Parse the arguments following the program name.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();

    let command = match args.as_slice() {
        [] | ["help"] | ["-h"] | ["--help"] => Command::Help,
        ["list"] => Command::List,
        ["discover", url] => Command::Discover(url.to_string()),
        ["add", title, url] => Command::Add {
            title: title.to_string(),
            url: url.to_string(),
        },
        ["remove", pos] => Command::Remove(position(pos)?),
        ["swap", a, b] => Command::Swap(position(a)?, position(b)?),
        ["set-url", title, url] => Command::SetUrl {
            title: title.to_string(),
            url: url.to_string(),
        },
        ["refresh"] => Command::Refresh(None),
        ["refresh", pos] => Command::Refresh(Some(position(pos)?)),
        ["news"] => Command::News(None),
        ["news", pos] => Command::News(Some(position(pos)?)),
        [verb @ ("read" | "unread"), pos, id] => Command::MarkRead {
            position: position(pos)?,
            article_id: id.to_string(),
            read: *verb == "read",
        },
        [verb @ ("bookmark" | "unbookmark"), pos, id] => Command::Bookmark {
            position: position(pos)?,
            article_id: id.to_string(),
            bookmarked: *verb == "bookmark",
        },
        ["bookmarks"] => Command::Bookmarks,
        ["cleanup"] => Command::Cleanup,
        _ => {
            return Err(AppError::Usage(format!(
                "unrecognized command: {}\n\n{}",
                args.join(" "),
                USAGE
            )))
        }
    };

    Ok(command)
}

fn position(arg: &str) -> Result<usize> {
    match arg.parse::<usize>() {
        Ok(pos) if pos > 0 => Ok(pos),
        _ => Err(AppError::Usage(format!(
            "feed position must be a number starting at 1, got '{}'",
            arg
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_args::<&str>(&[]).unwrap(), Command::Help);
        assert_eq!(parse_args(&["list"]).unwrap(), Command::List);
        assert_eq!(
            parse_args(&["add", "Tech News", "https://example.com/rss"]).unwrap(),
            Command::Add {
                title: "Tech News".to_string(),
                url: "https://example.com/rss".to_string()
            }
        );
        assert_eq!(parse_args(&["swap", "1", "3"]).unwrap(), Command::Swap(1, 3));
        assert_eq!(
            parse_args(&["discover", "https://example.com"]).unwrap(),
            Command::Discover("https://example.com".to_string())
        );
        assert_eq!(parse_args(&["refresh"]).unwrap(), Command::Refresh(None));
        assert_eq!(parse_args(&["news", "2"]).unwrap(), Command::News(Some(2)));
        assert_eq!(
            parse_args(&["unread", "1", "guid-1"]).unwrap(),
            Command::MarkRead {
                position: 1,
                article_id: "guid-1".to_string(),
                read: false
            }
        );
        assert_eq!(
            parse_args(&["bookmark", "2", "guid-9"]).unwrap(),
            Command::Bookmark {
                position: 2,
                article_id: "guid-9".to_string(),
                bookmarked: true
            }
        );
    }

    #[test]
    fn test_rejects_bad_positions() {
        assert!(matches!(parse_args(&["remove", "0"]), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(&["remove", "x"]), Err(AppError::Usage(_))));
    }

    #[test]
    fn test_rejects_unknown_command() {
        let err = parse_args(&["frobnicate"]).unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
        assert!(parse_args(&["add", "only-title"]).is_err());
    }
}
