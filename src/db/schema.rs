diesel::table! {
    songs (id) {
        id -> Integer,
        melon_uid -> Text,
        rank -> Integer,
        album_name -> Text,
        name -> Text,
        artist_name -> Text,
        cover_url -> Text,
        lyrics -> Text,
        genre -> Text,
        release_date -> Date,
        like_count -> Integer,
        slug -> Text,
    }
}
