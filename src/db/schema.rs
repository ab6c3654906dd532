pub const SCHEMA: &str = r#"
-- scraped article features; url uniqueness is kept by the insert path
CREATE TABLE IF NOT EXISTS Articles (
    title TEXT,
    url TEXT,
    author TEXT,
    datetime TEXT,
    domain TEXT,
    content TEXT,
    content_type TEXT
);

-- training labels, joined to Articles on url at query time
CREATE TABLE IF NOT EXISTS Labels (
    url TEXT,
    category TEXT
);
"#;
