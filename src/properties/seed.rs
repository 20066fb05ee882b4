use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::repo;

pub const IMAGES_PER_PROPERTY: usize = 3;

pub const SEED_IMAGE_URLS: [&str; 14] = [
    "https://images.unsplash.com/photo-1512917774080-9991f1c4c750?w=800&q=80",
    "https://images.unsplash.com/photo-1516594915697-87eb3b1a3069?w=800&q=80",
    "https://images.unsplash.com/photo-1522708323590-d24dbb6b0267?w=800&q=80",
    "https://images.unsplash.com/photo-1545324418-cc1a9a6fded0?w=800&q=80",
    "https://images.unsplash.com/photo-1494145904049-0dca59b4bbad?w=800&q=80",
    "https://images.unsplash.com/photo-1502672260266-1c1ef2d93688?w=800&q=80",
    "https://images.unsplash.com/photo-1486406146926-c627a92ad1ab?w=800&q=80",
    "https://images.unsplash.com/photo-1454165804606-c3d57bc86b40?w=800&q=80",
    "https://images.unsplash.com/photo-1497366216548-495f67f88bda?w=800&q=80",
    "https://images.unsplash.com/photo-1500595046891-0573fbe7e6b7?w=800&q=80",
    "https://images.unsplash.com/photo-1500382017468-7049fdf98338?w=800&q=80",
    "https://images.unsplash.com/photo-1513984977263-4ca427ba0f9b?w=800&q=80",
    "https://images.unsplash.com/photo-1495615811223-4d98c6e9c869?w=800&q=80",
    "https://images.unsplash.com/photo-1568605114967-8130f3a36994?w=800&q=80",
];

#[derive(Debug, PartialEq, Eq)]
pub struct PlannedImage {
    pub property_id: Uuid,
    pub image_url: &'static str,
    pub image_order: i32,
}

#[derive(Debug)]
pub struct SeedReport {
    pub properties: usize,
    pub inserted: usize,
    pub total_images: i64,
}

/// Assigns `IMAGES_PER_PROPERTY` images to each property, cycling through
/// the seed URLs so neighbouring properties get different pictures.
pub fn plan_images(property_ids: &[Uuid]) -> Vec<PlannedImage> {
    property_ids
        .iter()
        .enumerate()
        .flat_map(|(n, &property_id)| {
            (0..IMAGES_PER_PROPERTY).map(move |slot| PlannedImage {
                property_id,
                image_url: SEED_IMAGE_URLS[(n * IMAGES_PER_PROPERTY + slot) % SEED_IMAGE_URLS.len()],
                image_order: slot as i32,
            })
        })
        .collect()
}

pub async fn seed_images(db: &PgPool) -> anyhow::Result<SeedReport> {
    let property_ids = repo::list_ids(db).await?;
    if property_ids.is_empty() {
        info!("no properties found to seed images for");
        return Ok(SeedReport {
            properties: 0,
            inserted: 0,
            total_images: repo::count_images(db).await?,
        });
    }

    info!(properties = property_ids.len(), "seeding property images");
    let plan = plan_images(&property_ids);
    for image in &plan {
        repo::insert_image(db, image.property_id, image.image_url, image.image_order).await?;
    }

    let total_images = repo::count_images(db).await?;
    info!(inserted = plan.len(), total_images, "property images seeded");
    Ok(SeedReport {
        properties: property_ids.len(),
        inserted: plan.len(),
        total_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_cycles_through_urls() {
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let plan = plan_images(&ids);
        assert_eq!(plan.len(), 18);

        assert_eq!(plan[0].image_url, SEED_IMAGE_URLS[0]);
        assert_eq!(plan[3].property_id, ids[1]);
        assert_eq!(plan[3].image_url, SEED_IMAGE_URLS[3]);
        assert_eq!(plan[3].image_order, 0);
        // 5th property, 2nd slot: index 13
        assert_eq!(plan[13].image_url, SEED_IMAGE_URLS[13]);
        // wraps
        assert_eq!(plan[14].image_url, SEED_IMAGE_URLS[0]);
        assert_eq!(plan[17].image_order, 2);
    }

    #[test]
    fn empty_plan_for_no_properties() {
        assert!(plan_images(&[]).is_empty());
    }
}
